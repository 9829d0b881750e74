use super::definition::{ExtraFields, FieldDefinition, ModelBody, ModelDefinition, TypeExpr};
use super::handle::{ModelHandle, ModelNamespace};
use crate::error::{CompileError, SchemaError};
use crate::naming::{operation_stem, to_camel_case};
use crate::schema::{AdditionalProperties, SchemaKind, SchemaMeta, SchemaNode, SchemaResolver};
use crate::spec::{OperationRef, ParameterMeta, SpecDocument};
use http::Method;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// The only media type models are compiled for
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// One documented response of an operation
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    pub description: String,
    /// Model of the `application/json` body, if the response declares one
    pub model: Option<ModelHandle>,
}

/// Compiled view of one (path, method) operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSpec {
    pub path: String,
    pub method: Method,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    pub parameters: Vec<ParameterMeta>,
    /// Model of the `application/json` request body
    pub request: Option<ModelHandle>,
    pub request_required: bool,
    /// Responses keyed by numeric status code
    pub responses: BTreeMap<u16, ResponseSpec>,
    /// Document the operation was declared in
    pub source: PathBuf,
}

impl OperationSpec {
    /// `"/pets POST"` style location used in diagnostics
    pub fn location(&self) -> String {
        format!("{} {}", self.path, self.method)
    }

    /// Status code of the primary response: 200 if declared, else the lowest 2xx
    pub fn primary_status(&self) -> Option<u16> {
        if self.responses.contains_key(&200) {
            return Some(200);
        }
        self.responses
            .keys()
            .copied()
            .find(|code| (200..300).contains(code))
    }

    pub fn primary_response(&self) -> Option<&ResponseSpec> {
        self.primary_status()
            .and_then(|code| self.responses.get(&code))
    }

    pub fn request_model(&self) -> Option<&ModelHandle> {
        self.request.as_ref()
    }

    /// Model of the primary response
    pub fn response_model(&self) -> Option<&ModelHandle> {
        self.primary_response().and_then(|r| r.model.as_ref())
    }
}

/// Every model and operation of one spec document
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDocument {
    pub source: PathBuf,
    pub namespace: Arc<ModelNamespace>,
    pub operations: Vec<OperationSpec>,
}

impl CompiledDocument {
    /// Handle to a model by name
    pub fn model(&self, name: &str) -> Option<ModelHandle> {
        ModelHandle::new(&self.namespace, name)
    }
}

/// Compile every component schema and every operation of `doc` into models.
///
/// Compilation is deterministic: the same document always yields the same
/// model names and structures.
///
/// # Errors
///
/// Returns [`CompileError::Schema`] naming the component or operation whose
/// schema could not be resolved.
pub fn compile_document(doc: &SpecDocument) -> Result<CompiledDocument, CompileError> {
    let mut compiler = ModelCompiler::new(doc);

    if let Some(components) = doc.component_schemas() {
        for key in components.keys() {
            let node = compiler
                .resolver
                .resolve_component(key)
                .map_err(|error| schema_error(doc.path(), format!("#/components/schemas/{key}"), error))?;
            compiler.component_model(key, &node);
        }
    }

    let mut pending = Vec::new();
    for op in doc.operations() {
        pending.push(compiler.operation(&op)?);
    }

    let namespace = Arc::new(ModelNamespace::from_models(compiler.models));
    let handle = |name: Option<String>| name.and_then(|n| ModelHandle::new(&namespace, &n));

    let operations: Vec<OperationSpec> = pending
        .into_iter()
        .map(|p| OperationSpec {
            path: p.op.path.to_string(),
            method: p.op.method.clone(),
            operation_id: p.op.operation_id().map(String::from),
            summary: p.op.summary().map(String::from),
            description: p.op.description().map(String::from),
            tags: p.op.tags(),
            deprecated: p.op.deprecated(),
            parameters: p.op.parameters(doc),
            request: handle(p.request),
            request_required: p.request_required,
            responses: p
                .responses
                .into_iter()
                .map(|(code, (description, model))| {
                    (
                        code,
                        ResponseSpec {
                            description,
                            model: handle(model),
                        },
                    )
                })
                .collect(),
            source: doc.path().to_path_buf(),
        })
        .collect();

    debug!(
        spec = %doc.path().display(),
        models = namespace.len(),
        operations = operations.len(),
        "compiled spec document"
    );

    Ok(CompiledDocument {
        source: doc.path().to_path_buf(),
        namespace,
        operations,
    })
}

fn schema_error(path: &Path, location: String, error: SchemaError) -> CompileError {
    CompileError::Schema {
        path: path.to_path_buf(),
        location,
        error,
    }
}

/// Operation whose models are known by name but not yet frozen into a namespace
struct PendingOperation<'a> {
    op: OperationRef<'a>,
    request: Option<String>,
    request_required: bool,
    responses: BTreeMap<u16, (String, Option<String>)>,
}

struct ModelCompiler<'a> {
    doc: &'a SpecDocument,
    resolver: SchemaResolver<'a>,
    models: BTreeMap<String, ModelDefinition>,
    /// component key -> model name
    components: HashMap<String, String>,
}

impl<'a> ModelCompiler<'a> {
    fn new(doc: &'a SpecDocument) -> Self {
        ModelCompiler {
            doc,
            resolver: SchemaResolver::new(doc),
            models: BTreeMap::new(),
            components: HashMap::new(),
        }
    }

    fn operation(&mut self, op: &OperationRef<'a>) -> Result<PendingOperation<'a>, CompileError> {
        let stem = operation_stem(op.operation_id(), &op.method, op.path);
        let doc = self.doc;
        let path = doc.path();

        let mut request = None;
        let mut request_required = false;
        if let Some(body) = op.operation.get("requestBody") {
            let location = format!("{} (requestBody)", op.location());
            let body = self
                .follow_local(body)
                .map_err(|e| schema_error(path, location.clone(), e))?;
            request_required = body.get("required").and_then(Value::as_bool).unwrap_or(false);
            if let Some(schema) = json_schema_of(body) {
                let node = self
                    .resolver
                    .resolve(schema)
                    .map_err(|e| schema_error(path, location, e))?;
                request = Some(self.top_model(&format!("{stem}Request"), &node));
            }
        }

        let mut responses = BTreeMap::new();
        if let Some(declared) = op.operation.get("responses").and_then(Value::as_object) {
            for (code, response) in declared {
                let Ok(status) = code.parse::<u16>() else {
                    continue;
                };
                let location = format!("{} (response {code})", op.location());
                let response = self
                    .follow_local(response)
                    .map_err(|e| schema_error(path, location.clone(), e))?;
                let description = response
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let model = match json_schema_of(response) {
                    Some(schema) => {
                        let node = self
                            .resolver
                            .resolve(schema)
                            .map_err(|e| schema_error(path, location, e))?;
                        let hint = if status == 200 {
                            format!("{stem}Response")
                        } else {
                            format!("{stem}Response{status}")
                        };
                        Some(self.top_model(&hint, &node))
                    }
                    None => None,
                };
                responses.insert(status, (description, model));
            }
        }

        Ok(PendingOperation {
            op: op.clone(),
            request,
            request_required,
            responses,
        })
    }

    /// Follow a `$ref` to a request body or response component
    fn follow_local(&self, value: &'a Value) -> Result<&'a Value, SchemaError> {
        match value.get("$ref").and_then(Value::as_str) {
            Some(reference) => {
                let doc = self.doc;
                doc.resolve_local(reference)
                    .ok_or_else(|| SchemaError::UnresolvedReference {
                        reference: reference.to_string(),
                    })
            }
            None => Ok(value),
        }
    }

    /// Name of the model behind a request or response body
    fn top_model(&mut self, hint: &str, node: &SchemaNode) -> String {
        if let SchemaKind::Reference(r) = &node.kind {
            return self.component_model(&r.target, &r.resolved);
        }
        let name = model_name(node, hint);
        let body = self.body_of(&name, node);
        self.register(name, body, node.meta.clone())
    }

    fn component_model(&mut self, key: &str, node: &SchemaNode) -> String {
        if let Some(name) = self.components.get(key) {
            return name.clone();
        }
        let name = model_name(node, &to_camel_case(key));
        let body = self.body_of(&name, node);
        let registered = self.register(name, body, node.meta.clone());
        self.components.insert(key.to_string(), registered.clone());
        registered
    }

    fn body_of(&mut self, name: &str, node: &SchemaNode) -> ModelBody {
        match &node.kind {
            SchemaKind::Object(obj)
                if !obj.properties.is_empty()
                    || obj.additional == AdditionalProperties::Forbidden =>
            {
                let mut fields = Vec::with_capacity(obj.properties.len());
                for (prop_name, prop) in &obj.properties {
                    let hint = format!("{name}{}", to_camel_case(prop_name));
                    let ty = self.type_of(prop, &hint);
                    fields.push(FieldDefinition {
                        name: prop_name.clone(),
                        ty,
                        required: obj.required.contains(prop_name),
                        nullable: prop.meta.nullable,
                        default: prop.meta.default.clone(),
                        meta: prop.meta.clone(),
                    });
                }
                let extra = match &obj.additional {
                    AdditionalProperties::Unspecified => ExtraFields::Unspecified,
                    AdditionalProperties::Forbidden => ExtraFields::Forbidden,
                    AdditionalProperties::Typed(value) => {
                        ExtraFields::Typed(self.type_of(value, &format!("{name}Value")))
                    }
                };
                ModelBody::Struct { fields, extra }
            }
            SchemaKind::Union(union) => ModelBody::Union {
                mode: union.mode,
                variants: union
                    .variants
                    .iter()
                    .enumerate()
                    .map(|(i, v)| self.type_of(v, &format!("{name}Variant{}", i + 1)))
                    .collect(),
            },
            _ => ModelBody::Alias(self.type_of(node, name)),
        }
    }

    fn type_of(&mut self, node: &SchemaNode, hint: &str) -> TypeExpr {
        match &node.kind {
            SchemaKind::Reference(r) => TypeExpr::Model(self.component_model(&r.target, &r.resolved)),
            SchemaKind::Object(obj)
                if obj.properties.is_empty()
                    && obj.additional != AdditionalProperties::Forbidden =>
            {
                let value = match &obj.additional {
                    AdditionalProperties::Typed(value) => self.type_of(value, &format!("{hint}Value")),
                    _ => TypeExpr::Any,
                };
                TypeExpr::Map(Box::new(value))
            }
            SchemaKind::Object(_) => {
                let name = model_name(node, hint);
                let body = self.body_of(&name, node);
                let mut meta = node.meta.clone();
                // nullability belongs to the field that holds the model
                meta.nullable = false;
                TypeExpr::Model(self.register(name, body, meta))
            }
            SchemaKind::Array(items) => {
                TypeExpr::Array(Box::new(self.type_of(items, &format!("{hint}Item"))))
            }
            SchemaKind::Primitive(p) => TypeExpr::Primitive(*p),
            SchemaKind::Union(union) => TypeExpr::Union(
                union.mode,
                union
                    .variants
                    .iter()
                    .enumerate()
                    .map(|(i, v)| self.type_of(v, &format!("{hint}Variant{}", i + 1)))
                    .collect(),
            ),
            SchemaKind::Any => TypeExpr::Any,
        }
    }

    /// Add a model under `name`, or under `name2`, `name3`, ... if a different
    /// model already owns the name. An identical model is reused.
    fn register(&mut self, name: String, body: ModelBody, meta: SchemaMeta) -> String {
        let mut attempt = name.clone();
        let mut suffix = 1;
        loop {
            match self.models.get(&attempt) {
                None => {
                    self.models.insert(
                        attempt.clone(),
                        ModelDefinition {
                            name: attempt.clone(),
                            body,
                            meta,
                        },
                    );
                    return attempt;
                }
                Some(existing) if existing.body == body && existing.meta == meta => return attempt,
                Some(_) => {
                    suffix += 1;
                    attempt = format!("{name}{suffix}");
                }
            }
        }
    }
}

/// Model name from the schema title, falling back to `hint`
fn model_name(node: &SchemaNode, hint: &str) -> String {
    let from_title = node
        .meta
        .title
        .as_deref()
        .map(to_camel_case)
        .filter(|s| !s.is_empty());
    match from_title {
        Some(name) => name,
        None if hint.is_empty() => "Model".to_string(),
        None => hint.to_string(),
    }
}

/// `content."application/json".schema` of a request body or response
fn json_schema_of(value: &Value) -> Option<&Value> {
    value.get("content")?.get(JSON_MEDIA_TYPE)?.get("schema")
}
