use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Keywords copied verbatim into [`SchemaMeta::constraints`].
///
/// They are advisory: the compiler carries them, the data-validation library enforces them.
pub const CONSTRAINT_KEYWORDS: [&str; 14] = [
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
    "uniqueItems",
    "minProperties",
    "maxProperties",
    "const",
];

/// Normalized form of one schema fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub meta: SchemaMeta,
}

/// Structural kind of a [`SchemaNode`].
///
/// `allOf` intersections never survive resolution: the resolver merges them into
/// a single [`SchemaKind::Object`].
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Object(ObjectNode),
    /// Homogeneous array; the box holds the item schema
    Array(Box<SchemaNode>),
    Primitive(PrimitiveType),
    /// `anyOf` / `oneOf` alternatives
    Union(UnionNode),
    /// A resolved `#/components/schemas/<target>` pointer
    Reference(ReferenceNode),
    /// No type information (`{}` or `true`)
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl PrimitiveType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(PrimitiveType::String),
            "number" => Some(PrimitiveType::Number),
            "integer" => Some(PrimitiveType::Integer),
            "boolean" => Some(PrimitiveType::Boolean),
            "null" => Some(PrimitiveType::Null),
            _ => None,
        }
    }

    /// JSON Schema `type` keyword value
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Number => "number",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Null => "null",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectNode {
    /// Properties in document order
    pub properties: Vec<(String, SchemaNode)>,
    pub required: BTreeSet<String>,
    pub additional: AdditionalProperties,
}

impl ObjectNode {
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
    }

    /// Insert or replace a property. A replaced property keeps its position.
    pub fn set_property(&mut self, name: String, node: SchemaNode) {
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = node,
            None => self.properties.push((name, node)),
        }
    }
}

/// `additionalProperties` of an object schema
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AdditionalProperties {
    /// Absent or `true`
    #[default]
    Unspecified,
    /// `false`
    Forbidden,
    /// A schema every extra property must satisfy (a typed map)
    Typed(Box<SchemaNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionMode {
    AnyOf,
    OneOf,
}

impl UnionMode {
    pub fn keyword(&self) -> &'static str {
        match self {
            UnionMode::AnyOf => "anyOf",
            UnionMode::OneOf => "oneOf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionNode {
    pub mode: UnionMode,
    pub variants: Vec<SchemaNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceNode {
    /// Component name the reference points at
    pub target: String,
    /// Fully resolved target schema
    pub resolved: Box<SchemaNode>,
}

/// Descriptive metadata and advisory constraints of a schema fragment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub example: Option<Value>,
    pub default: Option<Value>,
    pub format: Option<String>,
    pub enum_values: Vec<Value>,
    pub nullable: bool,
    pub constraints: Map<String, Value>,
}

impl SchemaMeta {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(String::from);
        let constraints = CONSTRAINT_KEYWORDS
            .iter()
            .filter_map(|k| obj.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect();
        SchemaMeta {
            title: text("title"),
            description: text("description"),
            example: obj.get("example").cloned().or_else(|| {
                obj.get("examples")
                    .and_then(Value::as_array)
                    .and_then(|e| e.first().cloned())
            }),
            default: obj.get("default").cloned(),
            format: text("format"),
            enum_values: obj
                .get("enum")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            nullable: obj.get("nullable").and_then(Value::as_bool).unwrap_or(false),
            constraints,
        }
    }

    /// Fill every unset field of `self` from `other`
    pub fn fill_from(&mut self, other: &SchemaMeta) {
        if self.title.is_none() {
            self.title = other.title.clone();
        }
        if self.description.is_none() {
            self.description = other.description.clone();
        }
        if self.example.is_none() {
            self.example = other.example.clone();
        }
        if self.default.is_none() {
            self.default = other.default.clone();
        }
        if self.format.is_none() {
            self.format = other.format.clone();
        }
        if self.enum_values.is_empty() {
            self.enum_values = other.enum_values.clone();
        }
        self.nullable |= other.nullable;
        for (k, v) in &other.constraints {
            if !self.constraints.contains_key(k) {
                self.constraints.insert(k.clone(), v.clone());
            }
        }
    }
}

impl SchemaNode {
    pub fn new(kind: SchemaKind, meta: SchemaMeta) -> Self {
        SchemaNode { kind, meta }
    }

    pub fn any() -> Self {
        SchemaNode::new(SchemaKind::Any, SchemaMeta::default())
    }

    /// Follow reference nodes down to the schema they point at
    pub fn target(&self) -> &SchemaNode {
        let mut node = self;
        while let SchemaKind::Reference(r) = &node.kind {
            node = &r.resolved;
        }
        node
    }

    /// Component name if this node is a reference
    pub fn reference_target(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Reference(r) => Some(&r.target),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match &self.target().kind {
            SchemaKind::Object(obj) => Some(obj),
            _ => None,
        }
    }
}
