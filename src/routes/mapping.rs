use super::handler::{handler_fn, HandlerContext, HandlerFactory, HandlerRequest, HandlerResponse, NameFactory};
use crate::model::OperationSpec;
use http::Method;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Caller configuration for one route, or for every route of one method.
///
/// Every field is optional; unset fields fall through to the next, less
/// specific source.
#[derive(Clone, Default)]
pub struct RouteInfo {
    pub(crate) factory: Option<HandlerFactory>,
    pub(crate) name: Option<String>,
    pub(crate) name_factory: Option<NameFactory>,
    pub(crate) summary: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) tags: Option<Vec<String>>,
    pub(crate) response_description: Option<String>,
    pub(crate) responses: BTreeMap<u16, String>,
}

impl RouteInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a fixed handler
    #[must_use]
    pub fn handler<F>(self, f: F) -> Self
    where
        F: Fn(HandlerRequest) -> HandlerResponse + Send + Sync + 'static,
    {
        let handler = handler_fn(f);
        self.handler_factory(move |_ctx: &HandlerContext<'_>| Arc::clone(&handler))
    }

    /// Bind a factory that builds the handler from the route's models
    #[must_use]
    pub fn handler_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&HandlerContext<'_>) -> super::Handler + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Derive the name from the path and operation; a static [`RouteInfo::name`] wins over this
    #[must_use]
    pub fn name_factory<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &OperationSpec) -> String + Send + Sync + 'static,
    {
        self.name_factory = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn response_description(mut self, description: impl Into<String>) -> Self {
        self.response_description = Some(description.into());
        self
    }

    /// Extra documentation for one response status
    #[must_use]
    pub fn response(mut self, status: u16, description: impl Into<String>) -> Self {
        self.responses.insert(status, description.into());
        self
    }

    pub fn has_handler(&self) -> bool {
        self.factory.is_some()
    }

    pub(crate) fn has_name_source(&self) -> bool {
        self.name.is_some() || self.name_factory.is_some()
    }
}

impl fmt::Debug for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteInfo")
            .field("handler", &self.factory.is_some())
            .field("name", &self.name)
            .field("name_factory", &self.name_factory.is_some())
            .field("summary", &self.summary)
            .field("description", &self.description)
            .field("tags", &self.tags)
            .field("response_description", &self.response_description)
            .field("responses", &self.responses)
            .finish()
    }
}

/// Default [`RouteInfo`] per method plus overrides per (path, method).
///
/// Registering the same key twice replaces the earlier entry.
#[derive(Debug, Clone, Default)]
pub struct RoutesMapping {
    defaults: HashMap<Method, RouteInfo>,
    /// Insertion-ordered overrides
    overrides: Vec<(String, Method, RouteInfo)>,
}

impl RoutesMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `info` to every route of `method` without an override
    pub fn set_default(&mut self, method: Method, info: RouteInfo) {
        self.defaults.insert(method, info);
    }

    /// Apply `info` to exactly one (path, method) route
    pub fn set_override(&mut self, path: impl Into<String>, method: Method, info: RouteInfo) {
        let path = path.into();
        match self
            .overrides
            .iter_mut()
            .find(|(p, m, _)| *p == path && *m == method)
        {
            Some(slot) => slot.2 = info,
            None => self.overrides.push((path, method, info)),
        }
    }

    pub fn default_for(&self, method: &Method) -> Option<&RouteInfo> {
        self.defaults.get(method)
    }

    pub fn override_for(&self, path: &str, method: &Method) -> Option<&RouteInfo> {
        self.overrides
            .iter()
            .find(|(p, m, _)| p == path && m == method)
            .map(|(_, _, info)| info)
    }

    /// Every (path, method) with an override, in registration order
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &Method)> {
        self.overrides.iter().map(|(p, m, _)| (p.as_str(), m))
    }
}
