//! # Route Resolver
//!
//! Binds every compiled operation to a handler and documentation metadata.
//!
//! Callers describe bindings with a [`RoutesMapping`]: one [`RouteInfo`] per
//! HTTP method as a default, and one per (path, method) as an override. The
//! [`RouteResolver`] turns each operation into an immutable [`RouteEntry`],
//! choosing the most specific binding available.
//!
//! ## Example
//!
//! ```rust,ignore
//! use specrouter::routes::{HandlerResponse, RouteInfo, RoutesMapping};
//! use http::Method;
//! use serde_json::json;
//!
//! let mut mapping = RoutesMapping::new();
//! mapping.set_default(Method::POST, RouteInfo::new().handler(|_req| HandlerResponse::json(200, json!({}))));
//! mapping.set_override(
//!     "/pet",
//!     Method::POST,
//!     RouteInfo::new().name("create_pet").handler(|_req| HandlerResponse::json(201, json!({}))),
//! );
//! ```

mod handler;
mod mapping;
mod resolver;

pub use handler::{
    handler_fn, stub_handler, Handler, HandlerContext, HandlerFactory, HandlerRequest,
    HandlerResponse, NameFactory,
};
pub use mapping::{RouteInfo, RoutesMapping};
pub use resolver::{HandlerSource, ResponseDoc, RouteEntry, RouteResolver, DEFAULT_RESPONSE_DESCRIPTION};
