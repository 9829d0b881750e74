use super::table::RouteTable;
use crate::config::{ConfigError, RouterConfig};
use crate::error::CompileError;
use crate::model::{compile_document, CompiledDocument, ModelHandle};
use crate::routes::{RouteEntry, RouteInfo, RouteResolver, RoutesMapping};
use crate::spec::load_specs;
use crate::validator::{resolve_validators, RuleSet, SpecValidator, ValidatorChain};
use http::Method;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// The serving framework's route-registration interface
pub trait RouteRegistrar {
    /// Register one resolved route.
    ///
    /// # Errors
    ///
    /// Whatever the framework reports; it aborts the assembly.
    fn register(&mut self, entry: &RouteEntry) -> anyhow::Result<()>;
}

impl RouteRegistrar for Vec<RouteEntry> {
    fn register(&mut self, entry: &RouteEntry) -> anyhow::Result<()> {
        self.push(entry.clone());
        Ok(())
    }
}

/// Builds a router from a tree of spec documents.
///
/// Documents are loaded, validated and compiled once, on first use; the
/// compiled documents are then reused by [`SpecRouter::resolve`] and the
/// model lookups. Handler bindings may change between calls.
#[derive(Debug)]
pub struct SpecRouter {
    specs_path: PathBuf,
    chain: ValidatorChain,
    mapping: RoutesMapping,
    allow_stubs: bool,
    strict: bool,
    compiled: Option<Vec<CompiledDocument>>,
}

impl SpecRouter {
    /// Router over `specs_path`, checked by the default validator followed by `validators`
    pub fn new(specs_path: impl Into<PathBuf>, validators: Vec<Arc<dyn SpecValidator>>) -> Self {
        SpecRouter {
            specs_path: specs_path.into(),
            chain: ValidatorChain::new(validators),
            mapping: RoutesMapping::new(),
            allow_stubs: false,
            strict: false,
            compiled: None,
        }
    }

    /// Router described by a [`RouterConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the rules file cannot be read or a
    /// configured validator name is unknown.
    pub fn from_config(config: &RouterConfig) -> Result<Self, ConfigError> {
        let rules = config
            .rules
            .as_deref()
            .map(RuleSet::from_path)
            .transpose()?;
        let validators = resolve_validators(&config.validators, rules.as_ref())?;
        Ok(SpecRouter::new(config.specs_path.clone(), validators)
            .allow_stubs(config.allow_stub_handlers)
            .strict(config.strict_validation))
    }

    /// Generate `200 {}` handlers for routes nothing binds
    #[must_use]
    pub fn allow_stubs(mut self, allow: bool) -> Self {
        self.allow_stubs = allow;
        self
    }

    /// Forbid unknown properties and check formats when validating payloads
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn specs_path(&self) -> &Path {
        &self.specs_path
    }

    pub fn validators(&self) -> &ValidatorChain {
        &self.chain
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Bind `info` to exactly one (path, method)
    pub fn route(&mut self, path: impl Into<String>, method: Method, info: RouteInfo) -> &mut Self {
        self.mapping.set_override(path, method, info);
        self
    }

    /// Bind `info` to every route of `method` without an override
    pub fn default_route(&mut self, method: Method, info: RouteInfo) -> &mut Self {
        self.mapping.set_default(method, info);
        self
    }

    pub fn post(&mut self, path: impl Into<String>, info: RouteInfo) -> &mut Self {
        self.route(path, Method::POST, info)
    }

    pub fn get(&mut self, path: impl Into<String>, info: RouteInfo) -> &mut Self {
        self.route(path, Method::GET, info)
    }

    pub fn mapping(&self) -> &RoutesMapping {
        &self.mapping
    }

    /// Load, validate and compile every document, once.
    ///
    /// # Errors
    ///
    /// The first [`CompileError`] of any document; nothing is cached then.
    pub fn compile(&mut self) -> Result<&[CompiledDocument], CompileError> {
        self.ensure_compiled()?;
        Ok(self.compiled.as_deref().unwrap_or_default())
    }

    fn ensure_compiled(&mut self) -> Result<(), CompileError> {
        if self.compiled.is_some() {
            return Ok(());
        }
        let documents = load_specs(&self.specs_path)?;
        let mut compiled = Vec::with_capacity(documents.len());
        for doc in &documents {
            self.chain.validate(doc)?;
            compiled.push(compile_document(doc)?);
        }
        info!(
            specs_path = %self.specs_path.display(),
            documents = compiled.len(),
            validators = ?self.chain.names(),
            "compiled spec tree"
        );
        self.compiled = Some(compiled);
        Ok(())
    }

    /// Resolve every route of the tree, in loader order.
    ///
    /// # Errors
    ///
    /// Any load, validation or schema failure, a duplicate route, an override
    /// for an undeclared route, or an unbound route when stubs are disabled.
    pub fn resolve(&mut self) -> Result<Vec<RouteEntry>, CompileError> {
        self.ensure_compiled()?;
        let documents = self.compiled.as_deref().unwrap_or_default();
        RouteResolver::new(&self.mapping, self.allow_stubs).resolve(documents)
    }

    /// Resolve every route, then register them in order.
    ///
    /// Returns the number of registered routes.
    ///
    /// # Errors
    ///
    /// Resolution failures register nothing. A registrar failure becomes
    /// [`CompileError::Registration`] and stops the assembly.
    pub fn assemble<R: RouteRegistrar + ?Sized>(&mut self, registrar: &mut R) -> Result<usize, CompileError> {
        let entries = self.resolve()?;
        for entry in &entries {
            registrar
                .register(entry)
                .map_err(|source| CompileError::Registration {
                    path: entry.path.clone(),
                    method: entry.method.clone(),
                    source,
                })?;
            debug!(path = %entry.path, method = %entry.method, name = %entry.name, "registered route");
        }
        info!(routes = entries.len(), "router assembled");
        Ok(entries.len())
    }

    /// Assemble into a fresh [`RouteTable`] honouring the strict flag.
    ///
    /// # Errors
    ///
    /// Same as [`SpecRouter::assemble`].
    pub fn route_table(&mut self) -> Result<RouteTable, CompileError> {
        let mut table = RouteTable::new(self.strict);
        self.assemble(&mut table)?;
        Ok(table)
    }

    /// Model of the request body of (path, method)
    ///
    /// # Errors
    ///
    /// Compilation failures of the tree.
    pub fn request_model(&mut self, path: &str, method: &Method) -> Result<Option<ModelHandle>, CompileError> {
        self.ensure_compiled()?;
        Ok(self
            .find_operation(path, method)
            .and_then(|op| op.request_model().cloned()))
    }

    /// Model of the primary response of (path, method): `200`, else the lowest 2xx
    ///
    /// # Errors
    ///
    /// Compilation failures of the tree.
    pub fn response_model(&mut self, path: &str, method: &Method) -> Result<Option<ModelHandle>, CompileError> {
        self.ensure_compiled()?;
        Ok(self
            .find_operation(path, method)
            .and_then(|op| op.response_model().cloned()))
    }

    fn find_operation(&self, path: &str, method: &Method) -> Option<&crate::model::OperationSpec> {
        self.compiled
            .as_deref()
            .unwrap_or_default()
            .iter()
            .flat_map(|doc| doc.operations.iter())
            .find(|op| op.path == path && op.method == *method)
    }
}
