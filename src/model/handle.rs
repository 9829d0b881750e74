use super::definition::ModelDefinition;
use crate::error::SchemaError;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// JSON Schema dialect of every generated schema
pub const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// All models compiled from one spec document, keyed by name.
///
/// Model names are unique within a namespace; two documents may reuse a name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelNamespace {
    models: BTreeMap<String, Arc<ModelDefinition>>,
}

impl ModelNamespace {
    pub(crate) fn from_models(models: BTreeMap<String, ModelDefinition>) -> Self {
        ModelNamespace {
            models: models
                .into_iter()
                .map(|(name, def)| (name, Arc::new(def)))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.get(name).map(|def| def.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// `name` and every model reachable from it
    fn closure(&self, name: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut pending = vec![name.to_string()];
        while let Some(next) = pending.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(def) = self.models.get(&next) {
                pending.extend(def.dependencies());
            }
        }
        seen
    }
}

/// Shared reference to one model of a namespace.
///
/// Cloning is cheap; the namespace stays alive as long as any handle does.
#[derive(Clone)]
pub struct ModelHandle {
    definition: Arc<ModelDefinition>,
    namespace: Arc<ModelNamespace>,
}

impl ModelHandle {
    /// Handle to `name` in `namespace`, if the namespace defines it
    pub fn new(namespace: &Arc<ModelNamespace>, name: &str) -> Option<Self> {
        let definition = namespace.models.get(name)?;
        Some(ModelHandle {
            definition: Arc::clone(definition),
            namespace: Arc::clone(namespace),
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    pub fn namespace(&self) -> &ModelNamespace {
        &self.namespace
    }

    /// Self-contained JSON Schema of the model.
    ///
    /// Every model it depends on is embedded under `$defs`, so the result can
    /// be handed to any JSON Schema 2020-12 validator as is.
    pub fn json_schema(&self, strict: bool) -> Value {
        let mut defs = Map::new();
        for name in self.namespace.closure(self.name()) {
            if name == self.name() {
                continue;
            }
            if let Some(def) = self.namespace.get(&name) {
                defs.insert(name, def.to_schema(strict));
            }
        }

        let mut schema = self.definition.to_schema(strict);
        if let Value::Object(obj) = &mut schema {
            obj.insert("$schema".into(), json!(SCHEMA_DIALECT));
            if !defs.is_empty() {
                obj.insert("$defs".into(), Value::Object(defs));
            }
        }
        schema
    }

    /// Compile a validator for payloads of this model.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidSchema`] if the generated schema is rejected
    /// by the validation library (for example an invalid `pattern`).
    pub fn validator(&self, strict: bool) -> Result<ModelValidator, SchemaError> {
        ModelValidator::new(self.name(), &self.json_schema(strict), strict)
    }
}

impl PartialEq for ModelHandle {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.definition.name)
            .finish()
    }
}

/// Compiled JSON Schema validator for one model
pub struct ModelValidator {
    model: String,
    validator: jsonschema::Validator,
}

impl ModelValidator {
    fn new(model: &str, schema: &Value, strict: bool) -> Result<Self, SchemaError> {
        let built = if strict {
            jsonschema::options()
                .should_validate_formats(true)
                .build(schema)
        } else {
            jsonschema::validator_for(schema)
        };
        let validator = built.map_err(|e| SchemaError::InvalidSchema {
            reason: format!("model {model}: {e}"),
        })?;
        Ok(ModelValidator {
            model: model.to_string(),
            validator,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Every violation of `instance`, as readable messages
    pub fn violations(&self, instance: &Value) -> Vec<String> {
        self.validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect()
    }
}

impl fmt::Debug for ModelValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelValidator")
            .field("model", &self.model)
            .finish()
    }
}
