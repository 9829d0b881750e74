use super::handler::{stub_handler, Handler, HandlerContext, HandlerRequest, HandlerResponse};
use super::mapping::{RouteInfo, RoutesMapping};
use crate::error::CompileError;
use crate::model::{CompiledDocument, ModelHandle, OperationSpec};
use crate::naming::default_route_name;
use crate::spec::ParameterMeta;
use http::Method;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Response description used when neither the caller nor the document gives one
pub const DEFAULT_RESPONSE_DESCRIPTION: &str = "Successful response";

/// Where a route's handler came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerSource {
    /// Registered for this exact (path, method)
    Override,
    /// Registered as the default of the route's method
    MethodDefault,
    /// No binding; the `200 {}` stub was generated
    Stub,
}

/// Documentation of one response status
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDoc {
    pub description: String,
    pub model: Option<ModelHandle>,
}

/// A fully resolved route, ready for registration.
///
/// Immutable once built; cloning shares the handler.
#[derive(Clone)]
pub struct RouteEntry {
    pub path: String,
    pub method: Method,
    pub name: String,
    pub summary: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub operation_id: Option<String>,
    pub deprecated: bool,
    pub parameters: Vec<ParameterMeta>,
    pub request_model: Option<ModelHandle>,
    pub request_required: bool,
    /// Model of the primary response
    pub response_model: Option<ModelHandle>,
    /// Status of the primary response (200 when the document declares none)
    pub response_status: u16,
    pub response_description: String,
    /// Every documented response, spec entries merged with caller extras
    pub responses: BTreeMap<u16, ResponseDoc>,
    pub handler: Handler,
    pub handler_source: HandlerSource,
    /// Document that declared the route
    pub source: PathBuf,
}

impl RouteEntry {
    /// Invoke the bound handler
    pub fn call(&self, mut request: HandlerRequest) -> HandlerResponse {
        request.route_name = self.name.clone();
        (self.handler)(request)
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("name", &self.name)
            .field("summary", &self.summary)
            .field("tags", &self.tags)
            .field("request_model", &self.request_model.as_ref().map(|m| m.name()))
            .field("response_model", &self.response_model.as_ref().map(|m| m.name()))
            .field("handler_source", &self.handler_source)
            .field("source", &self.source)
            .finish()
    }
}

/// Binds every compiled operation to a handler.
///
/// Handler precedence, most specific first:
///
/// 1. the override for the exact (path, method)
/// 2. the default of the method
/// 3. the stub handler, only if stubs are allowed
///
/// Anything else is [`CompileError::UnboundRoute`]. Documentation metadata
/// follows the same precedence and then falls back to the document.
pub struct RouteResolver<'m> {
    mapping: &'m RoutesMapping,
    allow_stubs: bool,
}

impl<'m> RouteResolver<'m> {
    pub fn new(mapping: &'m RoutesMapping, allow_stubs: bool) -> Self {
        RouteResolver {
            mapping,
            allow_stubs,
        }
    }

    /// Resolve the routes of every document, in document then operation order.
    ///
    /// Nothing is returned unless every route resolves.
    ///
    /// # Errors
    ///
    /// - [`CompileError::DuplicateRoute`] when two documents declare the same (path, method)
    /// - [`CompileError::UnknownRoute`] when an override targets an undeclared route
    /// - [`CompileError::UnboundRoute`] when a route has no handler and stubs are disabled
    pub fn resolve(&self, documents: &[CompiledDocument]) -> Result<Vec<RouteEntry>, CompileError> {
        let mut declared: HashMap<(&str, &Method), &PathBuf> = HashMap::new();
        for doc in documents {
            for op in &doc.operations {
                if let Some(first) = declared.insert((op.path.as_str(), &op.method), &op.source) {
                    return Err(CompileError::DuplicateRoute {
                        path: op.path.clone(),
                        method: op.method.clone(),
                        first: first.clone(),
                        second: op.source.clone(),
                    });
                }
            }
        }

        for (path, method) in self.mapping.overrides() {
            if !declared.contains_key(&(path, method)) {
                return Err(CompileError::UnknownRoute {
                    path: path.to_string(),
                    method: method.clone(),
                });
            }
        }

        let entries = documents
            .iter()
            .flat_map(|doc| doc.operations.iter())
            .map(|op| self.resolve_operation(op))
            .collect::<Result<Vec<_>, _>>()?;

        info!(routes = entries.len(), "resolved routes");
        Ok(entries)
    }

    fn resolve_operation(&self, op: &OperationSpec) -> Result<RouteEntry, CompileError> {
        let path_info = self.mapping.override_for(&op.path, &op.method);
        let method_info = self.mapping.default_for(&op.method);
        let layers: Vec<&RouteInfo> = [path_info, method_info].into_iter().flatten().collect();

        let ctx = HandlerContext { operation: op };
        let (handler, handler_source) = match (
            path_info.and_then(|i| i.factory.as_ref()),
            method_info.and_then(|i| i.factory.as_ref()),
        ) {
            (Some(factory), _) => (factory(&ctx), HandlerSource::Override),
            (None, Some(factory)) => (factory(&ctx), HandlerSource::MethodDefault),
            (None, None) if self.allow_stubs => (stub_handler(), HandlerSource::Stub),
            (None, None) => {
                return Err(CompileError::UnboundRoute {
                    path: op.path.clone(),
                    method: op.method.clone(),
                })
            }
        };

        let name = match layers.iter().find(|i| i.has_name_source()) {
            Some(info) => match (&info.name, &info.name_factory) {
                (Some(name), _) => name.clone(),
                (None, Some(factory)) => factory(op.path.as_str(), op),
                (None, None) => default_route_name(&op.method, &op.path),
            },
            None => default_route_name(&op.method, &op.path),
        };

        let summary = layers
            .iter()
            .find_map(|i| i.summary.clone())
            .or_else(|| op.summary.clone())
            .unwrap_or_else(|| name.clone());
        let description = layers
            .iter()
            .find_map(|i| i.description.clone())
            .or_else(|| op.description.clone());
        let tags = layers
            .iter()
            .find_map(|i| i.tags.clone())
            .unwrap_or_else(|| op.tags.clone());
        let response_description = layers
            .iter()
            .find_map(|i| i.response_description.clone())
            .or_else(|| {
                op.primary_response()
                    .map(|r| r.description.clone())
                    .filter(|d| !d.is_empty())
            })
            .unwrap_or_else(|| DEFAULT_RESPONSE_DESCRIPTION.to_string());

        let mut responses: BTreeMap<u16, ResponseDoc> = op
            .responses
            .iter()
            .map(|(code, r)| {
                (
                    *code,
                    ResponseDoc {
                        description: r.description.clone(),
                        model: r.model.clone(),
                    },
                )
            })
            .collect();
        // least specific first so the override's extras land last
        for info in layers.iter().rev() {
            for (code, description) in &info.responses {
                responses
                    .entry(*code)
                    .and_modify(|doc| doc.description = description.clone())
                    .or_insert_with(|| ResponseDoc {
                        description: description.clone(),
                        model: None,
                    });
            }
        }

        debug!(
            path = %op.path,
            method = %op.method,
            name = %name,
            source = ?handler_source,
            "resolved route"
        );

        Ok(RouteEntry {
            path: op.path.clone(),
            method: op.method.clone(),
            name,
            summary,
            description,
            tags,
            operation_id: op.operation_id.clone(),
            deprecated: op.deprecated,
            parameters: op.parameters.clone(),
            request_model: op.request.clone(),
            request_required: op.request_required,
            response_model: op.response_model().cloned(),
            response_status: op.primary_status().unwrap_or(200),
            response_description,
            responses,
            handler,
            handler_source,
            source: op.source.clone(),
        })
    }
}
