use super::SpecValidator;
use crate::error::{LoadError, ValidationError};
use crate::spec::{ParameterLocation, SpecDocument, OPERATION_KEYS};
use serde::Deserialize;
use std::path::Path;

/// A file of declarative validators.
///
/// ```yaml
/// validators:
///   - name: SingleEndpoint
///     exact_paths: 1
///     allowed_methods: [post]
///     forbidden_keys: [servers]
///     required_header_parameters: [authorization]
/// ```
///
/// JSON is accepted too, since YAML is a superset of it.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    #[serde(default)]
    pub validators: Vec<RuleSpec>,
}

impl RuleSet {
    /// Parse a rules file.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the file cannot be read or does not match the rules format.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| LoadError::new(path, e.to_string()))?;
        Self::from_str(&content).map_err(|e| LoadError::new(path, e))
    }

    /// Parse rules from YAML or JSON text.
    ///
    /// # Errors
    ///
    /// Returns the parser message when the text is not a valid rules document.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| format!("invalid rules file: {e}"))
    }

    pub fn get(&self, name: &str) -> Option<&RuleSpec> {
        self.validators.iter().find(|v| v.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.iter().map(|v| v.name.as_str())
    }
}

/// One named validator made of declarative checks. Unset checks are skipped.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default)]
    pub min_paths: Option<usize>,
    #[serde(default)]
    pub max_paths: Option<usize>,
    #[serde(default)]
    pub exact_paths: Option<usize>,
    /// Lower-case method keys every operation must use
    #[serde(default)]
    pub allowed_methods: Option<Vec<String>>,
    /// Methods that must appear on at least one path
    #[serde(default)]
    pub required_methods: Vec<String>,
    /// Top-level keys that must not appear (`servers`, `security`, ...)
    #[serde(default)]
    pub forbidden_keys: Vec<String>,
    /// Header parameters every operation must declare (case-insensitive)
    #[serde(default)]
    pub required_header_parameters: Vec<String>,
    #[serde(default)]
    pub require_operation_id: bool,
}

/// [`SpecValidator`] backed by a [`RuleSpec`]
#[derive(Debug, Clone)]
pub struct RuleValidator {
    spec: RuleSpec,
}

impl RuleValidator {
    pub fn new(spec: RuleSpec) -> Self {
        RuleValidator { spec }
    }
}

impl SpecValidator for RuleValidator {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn validate(&self, doc: &SpecDocument) -> Result<(), ValidationError> {
        let rule = &self.spec;

        for key in &rule.forbidden_keys {
            if doc.raw().get(key).is_some() {
                return Err(ValidationError::new(
                    "ForbiddenKey",
                    format!("top-level '{key}' section is not allowed"),
                ));
            }
        }

        let path_count = doc.paths().map(|p| p.len()).unwrap_or(0);
        if let Some(exact) = rule.exact_paths {
            if path_count != exact {
                return Err(ValidationError::new(
                    "PathCountMismatch",
                    format!("expected exactly {exact} path(s), found {path_count}"),
                ));
            }
        }
        if let Some(min) = rule.min_paths {
            if path_count < min {
                return Err(ValidationError::new(
                    "TooFewPaths",
                    format!("expected at least {min} path(s), found {path_count}"),
                ));
            }
        }
        if let Some(max) = rule.max_paths {
            if path_count > max {
                return Err(ValidationError::new(
                    "TooManyPaths",
                    format!("expected at most {max} path(s), found {path_count}"),
                ));
            }
        }

        let operations = doc.operations();

        if let Some(allowed) = &rule.allowed_methods {
            for op in &operations {
                let key = op.method.as_str().to_ascii_lowercase();
                if !allowed.iter().any(|m| m.eq_ignore_ascii_case(&key)) {
                    return Err(ValidationError::new(
                        "MethodNotAllowed",
                        format!("method {} is not allowed", op.method),
                    )
                    .at(op.location()));
                }
            }
        }

        for required in &rule.required_methods {
            let present = operations
                .iter()
                .any(|op| op.method.as_str().eq_ignore_ascii_case(required));
            if !present {
                let known = OPERATION_KEYS.contains(&required.to_ascii_lowercase().as_str());
                let message = if known {
                    format!("no {} operation is defined", required.to_ascii_uppercase())
                } else {
                    format!("'{required}' is not an HTTP method this tool understands")
                };
                return Err(ValidationError::new("MethodMissing", message));
            }
        }

        for op in &operations {
            if rule.require_operation_id && op.operation_id().is_none() {
                return Err(ValidationError::new("MissingOperationId", "operation has no operationId")
                    .at(op.location()));
            }
            if rule.required_header_parameters.is_empty() {
                continue;
            }
            let headers: Vec<String> = op
                .parameters(doc)
                .into_iter()
                .filter(|p| p.location == ParameterLocation::Header)
                .map(|p| p.name.to_ascii_lowercase())
                .collect();
            for header in &rule.required_header_parameters {
                if !headers.contains(&header.to_ascii_lowercase()) {
                    return Err(ValidationError::new(
                        "HeaderMissing",
                        format!("header parameter '{header}' is required"),
                    )
                    .at(op.location()));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_paths() -> SpecDocument {
        SpecDocument::from_value(
            "two.json",
            "two.json",
            json!({
                "openapi": "3.0.0",
                "servers": [],
                "paths": {
                    "/a": {"post": {"operationId": "a", "responses": {}}},
                    "/b": {"get": {"responses": {}}}
                }
            }),
        )
        .unwrap()
    }

    fn kind(spec: RuleSpec) -> Option<String> {
        RuleValidator::new(spec).validate(&two_paths()).err().map(|e| e.kind)
    }

    #[test]
    fn test_parse_rules_yaml() {
        let rules = RuleSet::from_str(
            "validators:\n  - name: OnePath\n    exact_paths: 1\n  - name: PostOnly\n    allowed_methods: [post]\n",
        )
        .unwrap();
        assert_eq!(rules.names().collect::<Vec<_>>(), vec!["OnePath", "PostOnly"]);
        assert_eq!(rules.get("OnePath").unwrap().exact_paths, Some(1));
    }

    #[test]
    fn test_unknown_rule_key_rejected() {
        let err = RuleSet::from_str("validators:\n  - name: X\n    exact_path: 1\n").unwrap_err();
        assert!(err.contains("invalid rules file"));
    }

    #[test]
    fn test_path_counts() {
        let exact = RuleSpec { name: "Exact".into(), exact_paths: Some(1), ..Default::default() };
        assert_eq!(kind(exact).as_deref(), Some("PathCountMismatch"));
        let max = RuleSpec { name: "Max".into(), max_paths: Some(1), ..Default::default() };
        assert_eq!(kind(max).as_deref(), Some("TooManyPaths"));
        let min = RuleSpec { name: "Min".into(), min_paths: Some(3), ..Default::default() };
        assert_eq!(kind(min).as_deref(), Some("TooFewPaths"));
        let ok = RuleSpec { name: "Ok".into(), min_paths: Some(2), max_paths: Some(2), ..Default::default() };
        assert_eq!(kind(ok), None);
    }

    #[test]
    fn test_method_rules() {
        let allowed = RuleSpec {
            name: "PostOnly".into(),
            allowed_methods: Some(vec!["post".into()]),
            ..Default::default()
        };
        assert_eq!(kind(allowed).as_deref(), Some("MethodNotAllowed"));
        let required = RuleSpec {
            name: "NeedsPut".into(),
            required_methods: vec!["put".into()],
            ..Default::default()
        };
        assert_eq!(kind(required).as_deref(), Some("MethodMissing"));
    }

    #[test]
    fn test_key_header_and_operation_id_rules() {
        let forbidden = RuleSpec {
            name: "NoServers".into(),
            forbidden_keys: vec!["servers".into()],
            ..Default::default()
        };
        assert_eq!(kind(forbidden).as_deref(), Some("ForbiddenKey"));
        let header = RuleSpec {
            name: "Auth".into(),
            required_header_parameters: vec!["Authorization".into()],
            ..Default::default()
        };
        assert_eq!(kind(header).as_deref(), Some("HeaderMissing"));
        let op_id = RuleSpec {
            name: "Ids".into(),
            require_operation_id: true,
            ..Default::default()
        };
        assert_eq!(kind(op_id).as_deref(), Some("MissingOperationId"));
    }
}
