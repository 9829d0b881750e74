//! # specrouter
//!
//! **specrouter** compiles a tree of [OpenAPI 3](https://spec.openapis.org/oas/v3.0.3)
//! documents into typed request/response models and handler-bound routes, and
//! hands those routes to an HTTP-serving framework.
//!
//! ## Overview
//!
//! Several teams each own a JSON spec document; the documents live in one
//! directory tree. At startup the tree is turned into a router, or the router
//! is not built at all: there is no best-effort mode. In CI the same pipeline
//! runs in report mode and lists every problem of every file.
//!
//! ## Architecture
//!
//! - **[`spec`]** - Spec Loader: deterministic discovery and parsing of documents
//! - **[`validator`]** - Validator Chain: the default validator, built-in and declarative custom validators
//! - **[`schema`]** - Schema Resolver: `$ref`/`allOf`/`anyOf`/`oneOf` normalization with cycle detection
//! - **[`model`]** - Model Compiler: named models, operations, and the payload validator adapter
//! - **[`routes`]** - Route Resolver: handler precedence, names and documentation metadata
//! - **[`router`]** - Router Assembler: the [`SpecRouter`] facade and the registrar boundary
//! - **[`conformance`]** - collect-all check of a whole tree
//! - **[`cli`]** - the `specrouter` command
//! - **[`config`]** / **[`logging`]** - configuration and subscriber setup
//!
//! ### Pipeline
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Loader as spec::load_specs
//!     participant Chain as validator::ValidatorChain
//!     participant Compiler as model::compile_document
//!     participant Resolver as routes::RouteResolver
//!     participant Registrar as router::RouteRegistrar
//!
//!     Caller->>Loader: specs root
//!     Loader-->>Caller: Vec<SpecDocument> (sorted by relative path)
//!     loop every document
//!         Caller->>Chain: validate(doc)
//!         Caller->>Compiler: compile_document(doc)
//!     end
//!     Caller->>Resolver: resolve(compiled documents)
//!     Resolver-->>Caller: Vec<RouteEntry>
//!     loop every entry
//!         Caller->>Registrar: register(entry)
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use http::Method;
//! use serde_json::json;
//! use specrouter::routes::{HandlerResponse, RouteInfo};
//! use specrouter::SpecRouter;
//!
//! let mut router = SpecRouter::new("specs", Vec::new());
//! router
//!     .default_route(Method::POST, RouteInfo::new().handler(|req| {
//!         HandlerResponse::json(200, req.body.unwrap_or(json!({})))
//!     }))
//!     .post("/pet", RouteInfo::new().name("create_pet").handler(|_req| {
//!         HandlerResponse::json(201, json!({"created": true}))
//!     }));
//!
//! let table = router.route_table()?;
//! ```
//!
//! ## Errors
//!
//! Every construction failure is a [`CompileError`] naming the offending
//! file, path or schema. The conformance check turns the same failures into
//! per-file entries of a [`ValidationReport`](validator::ValidationReport).

pub mod cli;
pub mod config;
pub mod conformance;
pub mod error;
pub mod logging;
pub mod model;
pub mod naming;
pub mod router;
pub mod routes;
pub mod schema;
pub mod spec;
pub mod validator;

pub use config::RouterConfig;
pub use error::{CompileError, LoadError, SchemaError, ValidationError};
pub use router::{RouteRegistrar, RouteTable, SpecRouter};
pub use spec::{load_spec, load_specs, SpecDocument};
pub use validator::{SpecValidator, ValidatorChain};
