use crate::schema::{PrimitiveType, SchemaMeta, UnionMode};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// Pointer prefix models use to reference each other inside a generated schema
pub const DEFS_PREFIX: &str = "#/$defs/";

/// Type of a field, an array item or a union member
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Primitive(PrimitiveType),
    Array(Box<TypeExpr>),
    /// Free-form object; the box is the value type (`Any` for untyped maps)
    Map(Box<TypeExpr>),
    /// Another model of the same namespace
    Model(String),
    Union(UnionMode, Vec<TypeExpr>),
    Any,
}

impl TypeExpr {
    /// Names of every model this type mentions
    pub fn referenced_models(&self, out: &mut BTreeSet<String>) {
        match self {
            TypeExpr::Model(name) => {
                out.insert(name.clone());
            }
            TypeExpr::Array(inner) | TypeExpr::Map(inner) => inner.referenced_models(out),
            TypeExpr::Union(_, variants) => {
                for v in variants {
                    v.referenced_models(out);
                }
            }
            TypeExpr::Primitive(_) | TypeExpr::Any => {}
        }
    }

    /// JSON Schema rendering of this type
    pub fn to_schema(&self) -> Value {
        match self {
            TypeExpr::Primitive(p) => json!({ "type": p.as_str() }),
            TypeExpr::Array(inner) => json!({ "type": "array", "items": inner.to_schema() }),
            TypeExpr::Map(inner) if **inner == TypeExpr::Any => json!({ "type": "object" }),
            TypeExpr::Map(inner) => {
                json!({ "type": "object", "additionalProperties": inner.to_schema() })
            }
            TypeExpr::Model(name) => json!({ "$ref": format!("{DEFS_PREFIX}{name}") }),
            TypeExpr::Union(mode, variants) => {
                let list: Vec<Value> = variants.iter().map(TypeExpr::to_schema).collect();
                let mut obj = Map::new();
                obj.insert(mode.keyword().to_string(), Value::Array(list));
                Value::Object(obj)
            }
            TypeExpr::Any => json!({}),
        }
    }
}

/// One property of a struct model
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// Property name exactly as written in the document
    pub name: String,
    pub ty: TypeExpr,
    pub required: bool,
    /// Explicit `null` is an accepted value
    pub nullable: bool,
    pub default: Option<Value>,
    /// Description, format, enum and constraints of the property
    pub meta: SchemaMeta,
}

impl FieldDefinition {
    fn to_schema(&self) -> Value {
        with_meta(self.ty.to_schema(), &self.meta)
    }
}

/// What a struct model does with properties it does not declare
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraFields {
    /// Left to the validation mode (forbidden in strict mode)
    Unspecified,
    Forbidden,
    Typed(TypeExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelBody {
    Struct {
        /// Fields in document order
        fields: Vec<FieldDefinition>,
        extra: ExtraFields,
    },
    Union {
        mode: UnionMode,
        variants: Vec<TypeExpr>,
    },
    /// A named array, primitive or map
    Alias(TypeExpr),
}

/// A named, compiled model.
///
/// Models never embed each other; nested models are referenced by name
/// through [`TypeExpr::Model`] and live in the same namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    pub name: String,
    pub body: ModelBody,
    pub meta: SchemaMeta,
}

impl ModelDefinition {
    pub fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        match &self.body {
            ModelBody::Struct { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Models referenced directly by this one
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        match &self.body {
            ModelBody::Struct { fields, extra } => {
                for f in fields {
                    f.ty.referenced_models(&mut out);
                }
                if let ExtraFields::Typed(ty) = extra {
                    ty.referenced_models(&mut out);
                }
            }
            ModelBody::Union { variants, .. } => {
                for v in variants {
                    v.referenced_models(&mut out);
                }
            }
            ModelBody::Alias(ty) => ty.referenced_models(&mut out),
        }
        out
    }

    /// JSON Schema for this model alone; references to other models use `#/$defs/<Name>`.
    ///
    /// In `strict` mode struct models without an explicit `additionalProperties`
    /// reject unknown fields.
    pub fn to_schema(&self, strict: bool) -> Value {
        let schema = match &self.body {
            ModelBody::Struct { fields, extra } => {
                let mut properties = Map::new();
                for f in fields {
                    properties.insert(f.name.clone(), f.to_schema());
                }
                let required: Vec<&str> = fields
                    .iter()
                    .filter(|f| f.required)
                    .map(|f| f.name.as_str())
                    .collect();

                let mut obj = Map::new();
                obj.insert("type".into(), json!("object"));
                obj.insert("properties".into(), Value::Object(properties));
                if !required.is_empty() {
                    obj.insert("required".into(), json!(required));
                }
                match extra {
                    ExtraFields::Forbidden => {
                        obj.insert("additionalProperties".into(), json!(false));
                    }
                    ExtraFields::Typed(ty) => {
                        obj.insert("additionalProperties".into(), ty.to_schema());
                    }
                    ExtraFields::Unspecified if strict => {
                        obj.insert("additionalProperties".into(), json!(false));
                    }
                    ExtraFields::Unspecified => {}
                }
                Value::Object(obj)
            }
            ModelBody::Union { mode, variants } => {
                TypeExpr::Union(*mode, variants.clone()).to_schema()
            }
            ModelBody::Alias(ty) => ty.to_schema(),
        };

        let mut schema = with_meta(schema, &self.meta);
        if let Value::Object(obj) = &mut schema {
            obj.insert("title".into(), json!(self.name));
        }
        schema
    }
}

/// Overlay documentation and constraint keywords onto a type schema.
///
/// A nullable schema is wrapped as `anyOf: [<schema>, {"type": "null"}]`.
fn with_meta(schema: Value, meta: &SchemaMeta) -> Value {
    let Value::Object(mut obj) = schema else {
        return schema;
    };
    if let Some(description) = &meta.description {
        obj.insert("description".into(), json!(description));
    }
    if let Some(format) = &meta.format {
        obj.insert("format".into(), json!(format));
    }
    if !meta.enum_values.is_empty() {
        obj.insert("enum".into(), Value::Array(meta.enum_values.clone()));
    }
    if let Some(default) = &meta.default {
        obj.insert("default".into(), default.clone());
    }
    if let Some(example) = &meta.example {
        obj.insert("examples".into(), json!([example]));
    }
    for (k, v) in &meta.constraints {
        obj.insert(k.clone(), v.clone());
    }

    if meta.nullable {
        if let Some(values) = obj.get_mut("enum").and_then(Value::as_array_mut) {
            if !values.contains(&Value::Null) {
                values.push(Value::Null);
            }
        }
        json!({ "anyOf": [Value::Object(obj), { "type": "null" }] })
    } else {
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: TypeExpr, required: bool) -> FieldDefinition {
        FieldDefinition {
            name: name.into(),
            ty,
            required,
            nullable: false,
            default: None,
            meta: SchemaMeta::default(),
        }
    }

    #[test]
    fn test_struct_schema_lists_required_fields() {
        let model = ModelDefinition {
            name: "Pet".into(),
            body: ModelBody::Struct {
                fields: vec![
                    field("name", TypeExpr::Primitive(PrimitiveType::String), true),
                    field("tag", TypeExpr::Model("Tag".into()), false),
                ],
                extra: ExtraFields::Unspecified,
            },
            meta: SchemaMeta::default(),
        };
        let schema = model.to_schema(false);
        assert_eq!(schema["title"], "Pet");
        assert_eq!(schema["required"], json!(["name"]));
        assert_eq!(schema["properties"]["tag"]["$ref"], "#/$defs/Tag");
        assert!(schema.get("additionalProperties").is_none());
        assert_eq!(model.to_schema(true)["additionalProperties"], json!(false));
        assert_eq!(model.dependencies(), BTreeSet::from(["Tag".to_string()]));
    }

    #[test]
    fn test_nullable_field_accepts_null() {
        let mut f = field("note", TypeExpr::Primitive(PrimitiveType::String), false);
        f.meta.nullable = true;
        f.meta.enum_values = vec![json!("a")];
        let schema = f.to_schema();
        assert_eq!(schema["anyOf"][1], json!({"type": "null"}));
        assert_eq!(schema["anyOf"][0]["enum"], json!(["a", null]));
    }
}
