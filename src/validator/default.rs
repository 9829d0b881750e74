use super::SpecValidator;
use crate::error::{SchemaError, ValidationError};
use crate::schema::{component_name, SchemaResolver};
use crate::spec::{OperationRef, SpecDocument};
use serde_json::Value;
use std::collections::BTreeSet;

/// Baseline structural checks every document must pass before it is compiled.
///
/// Checks, in order:
///
/// 1. **Version** - `openapi` must start with `3` (`UnsupportedVersion`)
/// 2. **Paths shape** - `paths` and every operation are objects (`InvalidPaths`, `InvalidOperation`)
/// 3. **References** - every `$ref` in the document resolves locally (`UnresolvedReference`)
/// 4. **Parameters** - every parameter has a `name` (`MissingParameter`)
/// 5. **Bodies** - request bodies and responses convert to a schema
/// 6. **Components** - every component schema resolves, and every referenced one has a
///    non-empty `title` (`MissingSchemaTitle`)
///
/// `example`, `default`, `enum` and `const` values are data and are not searched for `$ref`s.
///
/// Resolver failures are reported with the [`SchemaError`] as `cause`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultValidator;

pub const DEFAULT_VALIDATOR_NAME: &str = "DefaultValidator";

impl SpecValidator for DefaultValidator {
    fn name(&self) -> &str {
        DEFAULT_VALIDATOR_NAME
    }

    fn validate(&self, doc: &SpecDocument) -> Result<(), ValidationError> {
        check_version(doc)?;
        check_paths_shape(doc)?;
        let referenced = check_references(doc)?;

        let mut resolver = SchemaResolver::new(doc);
        for op in doc.operations() {
            check_parameters(doc, &op)?;
            check_bodies(doc, &op, &mut resolver)?;
        }
        check_components(doc, &mut resolver, &referenced)
    }
}

fn check_version(doc: &SpecDocument) -> Result<(), ValidationError> {
    match doc.openapi_version() {
        Some(version) if version.starts_with('3') => Ok(()),
        Some(version) => Err(ValidationError::new(
            "UnsupportedVersion",
            format!("OpenAPI version '{version}' is not supported, expected 3.x"),
        )
        .at("openapi")),
        None => Err(ValidationError::new(
            "UnsupportedVersion",
            "document has no 'openapi' version string",
        )),
    }
}

fn check_paths_shape(doc: &SpecDocument) -> Result<(), ValidationError> {
    let Some(paths) = doc.raw().get("paths") else {
        return Ok(());
    };
    let paths = paths
        .as_object()
        .ok_or_else(|| ValidationError::new("InvalidPaths", "'paths' must be an object").at("paths"))?;

    for (path, item) in paths {
        let item = item.as_object().ok_or_else(|| {
            ValidationError::new("InvalidPaths", "path item must be an object").at(path.as_str())
        })?;
        for key in crate::spec::OPERATION_KEYS {
            if let Some(operation) = item.get(key) {
                if !operation.is_object() {
                    return Err(ValidationError::new(
                        "InvalidOperation",
                        format!("operation '{key}' must be an object"),
                    )
                    .at(path.as_str()));
                }
            }
        }
    }
    Ok(())
}

/// Keywords whose values are instance data rather than schema or spec structure
const VALUE_KEYWORDS: [&str; 4] = ["example", "default", "enum", "const"];

/// Containers whose keys are user-chosen names, so a child called `default`
/// (the default response, a property) is still structure
const NAME_MAPS: [&str; 9] = [
    "properties",
    "patternProperties",
    "responses",
    "schemas",
    "definitions",
    "$defs",
    "headers",
    "content",
    "examples",
];

/// Walk the whole document and make sure every `$ref` points somewhere.
///
/// Returns the names of the component schemas reached by some `$ref`.
fn check_references(doc: &SpecDocument) -> Result<BTreeSet<String>, ValidationError> {
    let mut referenced = BTreeSet::new();
    let mut pending: Vec<(String, Option<&str>, &Value)> = vec![(String::new(), None, doc.raw())];

    while let Some((pointer, parent_key, value)) = pending.pop() {
        match value {
            Value::Object(obj) => {
                if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
                    let local = reference.starts_with('#');
                    if !local || doc.resolve_local(reference).is_none() {
                        let location = if pointer.is_empty() { "#".to_string() } else { format!("#{pointer}") };
                        return Err(ValidationError::from_schema(
                            location,
                            SchemaError::UnresolvedReference {
                                reference: reference.to_string(),
                            },
                        ));
                    }
                    if let Some(name) = component_name(reference) {
                        referenced.insert(name);
                    }
                }
                let named_entries = parent_key.is_some_and(|key| NAME_MAPS.contains(&key));
                for (key, child) in obj.iter().rev() {
                    if !named_entries && VALUE_KEYWORDS.contains(&key.as_str()) {
                        continue;
                    }
                    let escaped = key.replace('~', "~0").replace('/', "~1");
                    pending.push((format!("{pointer}/{escaped}"), Some(key.as_str()), child));
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate().rev() {
                    pending.push((format!("{pointer}/{index}"), None, child));
                }
            }
            _ => {}
        }
    }
    Ok(referenced)
}

fn check_parameters(doc: &SpecDocument, op: &OperationRef<'_>) -> Result<(), ValidationError> {
    for source in [op.path_item, op.operation] {
        let Some(params) = source.get("parameters") else {
            continue;
        };
        let params = params.as_array().ok_or_else(|| {
            ValidationError::new("MissingParameter", "'parameters' must be an array").at(op.location())
        })?;
        for param in params {
            let param = match param.get("$ref").and_then(Value::as_str) {
                Some(reference) => doc.resolve_local(reference).unwrap_or(param),
                None => param,
            };
            let named = param
                .get("name")
                .and_then(Value::as_str)
                .map(|n| !n.is_empty())
                .unwrap_or(false);
            if !named {
                return Err(ValidationError::new(
                    "MissingParameter",
                    "parameter has no 'name'",
                )
                .at(op.location()));
            }
            if param.get("in").and_then(Value::as_str).is_none() {
                return Err(ValidationError::new(
                    "MissingParameter",
                    "parameter has no 'in' location",
                )
                .at(op.location()));
            }
        }
    }
    Ok(())
}

fn check_bodies(
    doc: &SpecDocument,
    op: &OperationRef<'_>,
    resolver: &mut SchemaResolver<'_>,
) -> Result<(), ValidationError> {
    if let Some(body) = op.operation.get("requestBody") {
        let location = format!("{} (requestBody)", op.location());
        check_body(doc, body, &location, resolver)?;
    }

    let Some(responses) = op.operation.get("responses") else {
        return Ok(());
    };
    let responses = responses.as_object().ok_or_else(|| {
        ValidationError::new("InvalidResponses", "'responses' must be an object").at(op.location())
    })?;
    for (code, response) in responses {
        let location = format!("{} (response {code})", op.location());
        check_body(doc, response, &location, resolver)?;
    }
    Ok(())
}

/// A request body or response: an object whose `content` media types carry schemas
fn check_body(
    doc: &SpecDocument,
    body: &Value,
    location: &str,
    resolver: &mut SchemaResolver<'_>,
) -> Result<(), ValidationError> {
    let body = match body.get("$ref").and_then(Value::as_str) {
        Some(reference) => doc.resolve_local(reference).ok_or_else(|| {
            ValidationError::from_schema(
                location,
                SchemaError::UnresolvedReference {
                    reference: reference.to_string(),
                },
            )
        })?,
        None => body,
    };
    if !body.is_object() {
        return Err(ValidationError::new("InvalidBody", "must be an object").at(location));
    }
    let Some(content) = body.get("content") else {
        return Ok(());
    };
    let content = content
        .as_object()
        .ok_or_else(|| ValidationError::new("InvalidBody", "'content' must be an object").at(location))?;

    for media in content.values() {
        if let Some(schema) = media.get("schema") {
            resolver
                .resolve(schema)
                .map_err(|e| ValidationError::from_schema(location, e))?;
            check_title(doc, schema, location)?;
        }
    }
    Ok(())
}

/// A body schema that is a component reference must name a component with a title.
fn check_title(doc: &SpecDocument, schema: &Value, location: &str) -> Result<(), ValidationError> {
    let Some(name) = schema
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(component_name)
    else {
        return Ok(());
    };
    let component = doc.component_schemas().and_then(|c| c.get(&name));
    title_error(&name, component.and_then(|c| c.get("title")), true).map_or(Ok(()), |err| Err(err.at(location)))
}

fn check_components(
    doc: &SpecDocument,
    resolver: &mut SchemaResolver<'_>,
    referenced: &BTreeSet<String>,
) -> Result<(), ValidationError> {
    let Some(components) = doc.component_schemas() else {
        return Ok(());
    };
    for (name, schema) in components {
        let location = format!("#/components/schemas/{name}");
        resolver
            .resolve_component(name)
            .map_err(|e| ValidationError::from_schema(location.as_str(), e))?;
        if let Some(err) = title_error(name, schema.get("title"), referenced.contains(name)) {
            return Err(err.at(location));
        }
    }
    Ok(())
}

/// An unreferenced component may omit its title; a present title must be a non-empty string.
fn title_error(name: &str, title: Option<&Value>, referenced: bool) -> Option<ValidationError> {
    match title {
        None if referenced => Some(ValidationError::new(
            "MissingSchemaTitle",
            format!("schema '{name}' is referenced but has no title"),
        )),
        None => None,
        Some(Value::String(title)) if !title.trim().is_empty() => None,
        Some(_) => Some(ValidationError::new(
            "MissingSchemaTitle",
            format!("schema '{name}' has an empty or non-string title"),
        )),
    }
}
