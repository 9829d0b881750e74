//! # Router Module
//!
//! The router module ties the pipeline together and hands the result to a
//! serving framework.
//!
//! ## Overview
//!
//! [`SpecRouter`] is the facade callers use at startup:
//!
//! 1. **Load** every spec document under a root directory (fail fast)
//! 2. **Validate** each document through the [`ValidatorChain`](crate::validator::ValidatorChain)
//! 3. **Compile** schemas into models and operations
//! 4. **Resolve** one handler per (path, method)
//! 5. **Assemble** the resolved routes into a [`RouteRegistrar`]
//!
//! Nothing is registered unless every step succeeds, so a registrar never
//! sees a partial router.
//!
//! ## Registrars
//!
//! Production serving stays outside this crate: implement [`RouteRegistrar`]
//! for the framework of choice. [`RouteTable`] is the in-crate registrar. It
//! matches `{param}` templates with compiled regexes, checks JSON bodies
//! against the request model and invokes the bound handler.
//!
//! ## Example
//!
//! ```rust,ignore
//! use specrouter::router::{RouteTable, SpecRouter};
//! use specrouter::routes::{HandlerRequest, HandlerResponse, RouteInfo};
//! use http::Method;
//!
//! let mut router = SpecRouter::new("specs", Vec::new());
//! router.default_route(
//!     Method::POST,
//!     RouteInfo::new().handler(|_req| HandlerResponse::json(200, serde_json::json!({}))),
//! );
//!
//! let table = router.route_table()?;
//! let response = table.dispatch(HandlerRequest::new(Method::POST, "/pet"));
//! ```

mod assembler;
mod table;
#[cfg(test)]
mod tests;

pub use assembler::{RouteRegistrar, SpecRouter};
pub use table::{RouteMatch, RouteTable};
