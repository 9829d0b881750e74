use super::SpecValidator;
use crate::error::ValidationError;
use crate::schema::COMPONENT_SCHEMA_PREFIX;
use crate::spec::SpecDocument;
use serde_json::{Map, Value};

pub const DATA_PRODUCT_STANDARDS_NAME: &str = "DataProductStandards";

/// Checks that a document describes a single data product.
///
/// A data product exposes exactly one `POST` endpoint whose request and
/// `200` response bodies are `application/json` references to component
/// schemas, and which takes the `authorization` and
/// `x-authorization-provider` headers. Server and security sections are
/// owned by the gateway and must not appear.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataProductStandardsValidator;

impl SpecValidator for DataProductStandardsValidator {
    fn name(&self) -> &str {
        DATA_PRODUCT_STANDARDS_NAME
    }

    fn validate(&self, doc: &SpecDocument) -> Result<(), ValidationError> {
        let raw = doc.raw();
        if raw.get("servers").is_some() {
            return Err(ValidationError::new(
                "ServersShouldNotBeDefined",
                "\"servers\" section found",
            ));
        }

        let paths = doc.paths().filter(|p| !p.is_empty()).ok_or_else(|| {
            ValidationError::new("NoEndpointsDefined", "no paths are defined")
        })?;
        if paths.len() > 1 {
            return Err(ValidationError::new(
                "OnlyOneEndpointAllowed",
                format!("{} paths defined, a data product has exactly one", paths.len()),
            ));
        }

        let mut post = None;
        for (path, item) in paths {
            let item = item.as_object().cloned().unwrap_or_default();
            post = item.get("post").cloned();
            if post.is_none() {
                return Err(ValidationError::new("PostMethodIsMissing", "no POST operation").at(path.as_str()));
            }
            if item.keys().any(|k| k != "post") {
                return Err(ValidationError::new(
                    "OnlyPostMethodAllowed",
                    "only the POST method may be defined",
                )
                .at(path.as_str()));
            }
        }
        let post = post.unwrap_or(Value::Null);

        let schemas = doc
            .component_schemas()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValidationError::new("SchemaMissing", "no \"components/schemas\" section defined"))?;

        if post.get("security").is_some() {
            return Err(ValidationError::new(
                "SecurityShouldNotBeDefined",
                "\"security\" section found",
            ));
        }

        if let Some(body) = post.get("requestBody") {
            if body.get("content").map(has_entries).unwrap_or(false) {
                check_component_body(body, schemas)?;
            }
        }

        let ok_response = post
            .get("responses")
            .and_then(|r| r.get("200"))
            .filter(|r| r.get("content").map(has_entries).unwrap_or(false))
            .ok_or_else(|| ValidationError::new("ResponseBodyMissing", "no 200 response body defined"))?;
        check_component_body(ok_response, schemas)?;

        let headers: Vec<String> = post
            .get("parameters")
            .and_then(Value::as_array)
            .map(|params| {
                params
                    .iter()
                    .filter(|p| p.get("in").and_then(Value::as_str) == Some("header"))
                    .filter_map(|p| p.get("name").and_then(Value::as_str))
                    .map(str::to_ascii_lowercase)
                    .collect()
            })
            .unwrap_or_default();
        if !headers.iter().any(|h| h == "authorization") {
            return Err(ValidationError::new(
                "AuthorizationHeaderMissing",
                "the 'authorization' header parameter is required",
            ));
        }
        if !headers.iter().any(|h| h == "x-authorization-provider") {
            return Err(ValidationError::new(
                "AuthProviderHeaderMissing",
                "the 'x-authorization-provider' header parameter is required",
            ));
        }
        Ok(())
    }
}

fn has_entries(value: &Value) -> bool {
    value.as_object().map(|o| !o.is_empty()).unwrap_or(false)
}

fn check_component_body(body: &Value, schemas: &Map<String, Value>) -> Result<(), ValidationError> {
    let media = body
        .get("content")
        .and_then(|c| c.get("application/json"))
        .ok_or_else(|| {
            ValidationError::new(
                "WrongContentType",
                "model description must be in application/json format",
            )
        })?;
    let reference = media
        .get("schema")
        .and_then(|s| s.get("$ref"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ValidationError::new(
                "SchemaMissing",
                "request or response model is missing from \"schema/$ref\" section",
            )
        })?;
    let name = reference.strip_prefix(COMPONENT_SCHEMA_PREFIX).ok_or_else(|| {
        ValidationError::new(
            "SchemaMissing",
            "request and response models must be defined in the \"#/components/schemas/\" section",
        )
    })?;
    if !schemas.contains_key(name) {
        return Err(ValidationError::new(
            "SchemaMissing",
            format!("component schema is missing for {name}"),
        ));
    }
    Ok(())
}
