use super::assembler::RouteRegistrar;
use crate::model::ModelValidator;
use crate::routes::{HandlerRequest, HandlerResponse, RouteEntry};
use anyhow::Context;
use http::Method;
use regex::Regex;
use serde_json::json;
use std::fmt;
use tracing::{debug, info, warn};

/// Result of matching a request path to a registered route
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    /// Path parameters extracted from the template, in template order
    pub path_params: Vec<(String, String)>,
}

struct TableRoute {
    pattern: Regex,
    param_names: Vec<String>,
    entry: RouteEntry,
    body_validator: Option<ModelValidator>,
}

/// In-memory registrar that can dispatch requests.
///
/// Routes are matched in registration order. Request bodies are checked
/// against the route's request model before the handler sees them:
///
/// | Situation | Status |
/// |---|---|
/// | no template matches the path | 404 |
/// | a template matches, but not for this method | 405 with `allow` header |
/// | body missing where required, or not matching the model | 422 |
/// | otherwise | whatever the handler answers |
pub struct RouteTable {
    strict: bool,
    routes: Vec<TableRoute>,
}

impl RouteTable {
    /// Empty table; `strict` is passed on to every request-model validator
    pub fn new(strict: bool) -> Self {
        RouteTable {
            strict,
            routes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered routes, in registration order
    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.iter().map(|r| &r.entry)
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.routes.len());
        for route in &self.routes {
            println!(
                "[route] {} {} -> {}",
                route.entry.method, route.entry.path, route.entry.name
            );
        }
    }

    /// Find the route registered for `method` and `path`.
    ///
    /// `path` must not carry a query string.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|r| r.entry.method == *method)
            .find_map(|r| {
                r.capture(path).map(|path_params| RouteMatch {
                    entry: &r.entry,
                    path_params,
                })
            })
    }

    /// Methods registered for templates matching `path`
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = Vec::new();
        for route in self.routes.iter().filter(|r| r.pattern.is_match(path)) {
            if !methods.contains(&route.entry.method) {
                methods.push(route.entry.method.clone());
            }
        }
        methods
    }

    /// Route `request` to its handler.
    ///
    /// A query string on `request.path` is split off into `query_params`.
    pub fn dispatch(&self, mut request: HandlerRequest) -> HandlerResponse {
        if let Some((path, query)) = request.path.split_once('?') {
            request.query_params.extend(parse_query(query));
            request.path = path.to_string();
        }

        let Some(index) = self.routes.iter().position(|r| {
            r.entry.method == request.method && r.pattern.is_match(&request.path)
        }) else {
            let allowed = self.allowed_methods(&request.path);
            if allowed.is_empty() {
                warn!(method = %request.method, path = %request.path, "no route matched");
                return HandlerResponse::error(404, "Not Found");
            }
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            warn!(method = %request.method, path = %request.path, allow = %allow, "method not allowed");
            let mut response = HandlerResponse::error(405, "Method Not Allowed");
            response.set_header("allow", allow);
            return response;
        };
        let route = &self.routes[index];

        if let Some(validator) = &route.body_validator {
            match &request.body {
                None if route.entry.request_required => {
                    debug!(route = %route.entry.name, "request body missing");
                    return HandlerResponse::json(
                        422,
                        json!({
                            "error": "Request body is required",
                            "model": validator.model(),
                        }),
                    );
                }
                Some(body) => {
                    let violations = validator.violations(body);
                    if !violations.is_empty() {
                        debug!(
                            route = %route.entry.name,
                            model = validator.model(),
                            violations = violations.len(),
                            "request body rejected"
                        );
                        return HandlerResponse::json(
                            422,
                            json!({
                                "error": "Request validation failed",
                                "model": validator.model(),
                                "errors": violations,
                            }),
                        );
                    }
                }
                None => {}
            }
        }

        request.path_params = route.capture(&request.path).unwrap_or_default();
        debug!(
            method = %request.method,
            path = %request.path,
            route = %route.entry.name,
            path_params = ?request.path_params,
            "route matched"
        );
        route.entry.call(request)
    }
}

impl TableRoute {
    fn capture(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.pattern.captures(path)?;
        Some(
            self.param_names
                .iter()
                .zip(caps.iter().skip(1))
                .filter_map(|(name, m)| m.map(|m| (name.clone(), m.as_str().to_string())))
                .collect(),
        )
    }
}

impl RouteRegistrar for RouteTable {
    fn register(&mut self, entry: &RouteEntry) -> anyhow::Result<()> {
        let (pattern, param_names) = path_to_regex(&entry.path)
            .with_context(|| format!("invalid path template {}", entry.path))?;
        let body_validator = entry
            .request_model
            .as_ref()
            .map(|model| model.validator(self.strict))
            .transpose()
            .with_context(|| format!("cannot build request validator for {} {}", entry.method, entry.path))?;
        info!(
            method = %entry.method,
            path = %entry.path,
            route = %entry.name,
            validates_body = body_validator.is_some(),
            "route registered"
        );
        self.routes.push(TableRoute {
            pattern,
            param_names,
            entry: entry.clone(),
            body_validator,
        });
        Ok(())
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("strict", &self.strict)
            .field(
                "routes",
                &self
                    .routes
                    .iter()
                    .map(|r| format!("{} {}", r.entry.method, r.entry.path))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Convert a path template to an anchored regex and its parameter names.
///
/// `/users/{id}/posts/{postId}` becomes `^/users/([^/]+)/posts/([^/]+)$`
/// with parameters `["id", "postId"]`. Literal segments are escaped.
pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), regex::Error> {
    if path == "/" {
        return Ok((Regex::new(r"^/$")?, Vec::new()));
    }

    let mut pattern = String::with_capacity(path.len() + 5);
    pattern.push('^');
    let mut param_names = Vec::with_capacity(path.matches('{').count());

    for segment in path.split('/') {
        if segment.starts_with('{') && segment.ends_with('}') {
            let param_name = segment
                .trim_start_matches('{')
                .trim_end_matches('}')
                .to_string();
            pattern.push_str("/([^/]+)");
            param_names.push(param_name);
        } else if !segment.is_empty() {
            pattern.push('/');
            pattern.push_str(&regex::escape(segment));
        }
    }

    pattern.push('$');
    Ok((Regex::new(&pattern)?, param_names))
}

/// Decodes percent escapes and `+` the way form-encoded query strings do.
fn parse_query(query: &str) -> impl Iterator<Item = (String, String)> + '_ {
    url::form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned()))
}
