use crate::model::{ModelHandle, OperationSpec};
use http::Method;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Request data handed to a bound handler
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path as received
    pub path: String,
    /// Name of the route that matched
    pub route_name: String,
    /// Path parameters extracted from the template
    pub path_params: Vec<(String, String)>,
    /// Query string parameters
    pub query_params: Vec<(String, String)>,
    /// HTTP headers
    pub headers: Vec<(String, String)>,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
}

impl HandlerRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        HandlerRequest {
            method,
            path: path.into(),
            route_name: String::new(),
            path_params: Vec::new(),
            query_params: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics when a template repeats a parameter name.
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last occurrence wins)
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response produced by a handler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: Vec<(String, String)>,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a `content-type` header
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }

    /// Error response with an `{"error": ...}` body
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }
}

/// An invocable request handler
pub type Handler = Arc<dyn Fn(HandlerRequest) -> HandlerResponse + Send + Sync>;

/// Builds the handler of one route from its resolved models
pub type HandlerFactory = Arc<dyn Fn(&HandlerContext<'_>) -> Handler + Send + Sync>;

/// Derives a route name from the path and the operation
pub type NameFactory = Arc<dyn Fn(&str, &OperationSpec) -> String + Send + Sync>;

/// What a [`HandlerFactory`] gets to see about the route it builds a handler for
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub operation: &'a OperationSpec,
}

impl<'a> HandlerContext<'a> {
    pub fn path(&self) -> &'a str {
        &self.operation.path
    }

    pub fn method(&self) -> &'a Method {
        &self.operation.method
    }

    pub fn request_model(&self) -> Option<&'a ModelHandle> {
        self.operation.request_model()
    }

    pub fn response_model(&self) -> Option<&'a ModelHandle> {
        self.operation.response_model()
    }
}

/// Wrap a closure as a [`Handler`]
pub fn handler_fn<F>(f: F) -> Handler
where
    F: Fn(HandlerRequest) -> HandlerResponse + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Handler bound to routes that have nothing else when stubs are allowed: `200 {}`
pub fn stub_handler() -> Handler {
    handler_fn(|_req| HandlerResponse::json(200, json!({})))
}
