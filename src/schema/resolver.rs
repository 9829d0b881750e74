use super::node::{
    AdditionalProperties, ObjectNode, PrimitiveType, ReferenceNode, SchemaKind, SchemaMeta,
    SchemaNode, UnionMode, UnionNode,
};
use crate::error::SchemaError;
use crate::spec::SpecDocument;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::trace;

/// Prefix of every reference the resolver can follow
pub const COMPONENT_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// Inline nesting deeper than this is rejected rather than walked
const MAX_INLINE_DEPTH: usize = 128;

/// Extract the component name from a `#/components/schemas/<Name>` reference.
///
/// JSON pointer escapes are decoded (`~1` to `/`, then `~0` to `~`).
pub fn component_name(reference: &str) -> Option<String> {
    let raw = reference.strip_prefix(COMPONENT_SCHEMA_PREFIX)?;
    if raw.is_empty() || raw.contains('/') {
        return None;
    }
    Some(raw.replace("~1", "/").replace("~0", "~"))
}

/// Turns raw JSON schema fragments into [`SchemaNode`] trees.
///
/// References are followed through an explicit resolution stack so cycles are
/// detected instead of recursing forever. Components that finished resolving
/// are memoised; a resolver is meant to live for one document.
pub struct SchemaResolver<'a> {
    components: Option<&'a Map<String, Value>>,
    stack: Vec<String>,
    resolved: HashMap<String, SchemaNode>,
    depth: usize,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(doc: &'a SpecDocument) -> Self {
        Self::from_components(doc.component_schemas())
    }

    /// Resolver over a bare `components.schemas` table
    pub fn from_components(components: Option<&'a Map<String, Value>>) -> Self {
        SchemaResolver {
            components,
            stack: Vec::new(),
            resolved: HashMap::new(),
            depth: 0,
        }
    }

    /// Resolve the named component schema.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::UnresolvedReference`] if the component does not exist,
    /// or with whatever the component's body fails with.
    pub fn resolve_component(&mut self, name: &str) -> Result<SchemaNode, SchemaError> {
        let reference = format!(
            "{COMPONENT_SCHEMA_PREFIX}{}",
            name.replace('~', "~0").replace('/', "~1")
        );
        let node = self.resolve_reference(&reference)?;
        match node.kind {
            SchemaKind::Reference(r) => Ok(*r.resolved),
            _ => Ok(node),
        }
    }

    /// Resolve an arbitrary schema fragment.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::UnresolvedReference`] for a dangling or non-local `$ref`
    /// - [`SchemaError::CircularReference`] when a `$ref` chain revisits a schema being resolved
    /// - [`SchemaError::InvalidComposition`] for an `allOf` that cannot be merged into one object
    /// - [`SchemaError::InvalidSchema`] for tuple arrays, unknown types and other unsupported shapes
    pub fn resolve(&mut self, schema: &Value) -> Result<SchemaNode, SchemaError> {
        if self.depth >= MAX_INLINE_DEPTH {
            return Err(SchemaError::InvalidSchema {
                reason: format!("schema nesting exceeds {MAX_INLINE_DEPTH} levels"),
            });
        }
        self.depth += 1;
        let result = self.resolve_inner(schema);
        self.depth -= 1;
        result
    }

    fn resolve_inner(&mut self, schema: &Value) -> Result<SchemaNode, SchemaError> {
        let obj = match schema {
            Value::Object(obj) => obj,
            Value::Bool(true) => return Ok(SchemaNode::any()),
            other => {
                return Err(SchemaError::InvalidSchema {
                    reason: format!("expected a schema object, found {other}"),
                })
            }
        };

        if let Some(reference) = obj.get("$ref") {
            let reference = reference.as_str().ok_or_else(|| SchemaError::InvalidSchema {
                reason: "'$ref' must be a string".to_string(),
            })?;
            let mut node = self.resolve_reference(reference)?;
            node.meta = SchemaMeta::from_object(obj);
            return Ok(node);
        }

        let meta = SchemaMeta::from_object(obj);

        if let Some(branches) = obj.get("allOf") {
            return self.resolve_all_of(obj, branches, meta);
        }
        if let Some(branches) = obj.get("anyOf") {
            return self.resolve_union(UnionMode::AnyOf, branches, meta);
        }
        if let Some(branches) = obj.get("oneOf") {
            return self.resolve_union(UnionMode::OneOf, branches, meta);
        }

        match obj.get("type") {
            Some(Value::String(ty)) => self.resolve_typed(obj, ty, meta),
            Some(Value::Array(types)) => self.resolve_type_array(obj, types, meta),
            Some(other) => Err(SchemaError::InvalidSchema {
                reason: format!("'type' must be a string or an array, found {other}"),
            }),
            None if obj.contains_key("properties") || obj.contains_key("additionalProperties") => {
                self.resolve_object(obj, meta)
            }
            None if obj.contains_key("items") => self.resolve_array(obj, meta),
            None => Ok(SchemaNode::new(SchemaKind::Any, meta)),
        }
    }

    fn resolve_reference(&mut self, reference: &str) -> Result<SchemaNode, SchemaError> {
        let unresolved = || SchemaError::UnresolvedReference {
            reference: reference.to_string(),
        };
        let name = component_name(reference).ok_or_else(unresolved)?;

        if let Some(pos) = self.stack.iter().position(|n| *n == name) {
            let mut chain = self.stack[pos..].to_vec();
            chain.push(name);
            return Err(SchemaError::CircularReference { chain });
        }

        let resolved = match self.resolved.get(&name) {
            Some(done) => done.clone(),
            None => {
                let target = self
                    .components
                    .and_then(|c| c.get(&name))
                    .ok_or_else(unresolved)?;
                trace!(component = %name, "resolving component schema");
                self.stack.push(name.clone());
                let result = self.resolve(target);
                self.stack.pop();
                let mut node = result?;
                if node.meta.title.is_none() {
                    node.meta.title = Some(name.clone());
                }
                self.resolved.insert(name.clone(), node.clone());
                node
            }
        };

        Ok(SchemaNode::new(
            SchemaKind::Reference(ReferenceNode {
                target: name,
                resolved: Box::new(resolved),
            }),
            SchemaMeta::default(),
        ))
    }

    fn resolve_typed(
        &mut self,
        obj: &Map<String, Value>,
        ty: &str,
        meta: SchemaMeta,
    ) -> Result<SchemaNode, SchemaError> {
        match ty {
            "object" => self.resolve_object(obj, meta),
            "array" => self.resolve_array(obj, meta),
            other => match PrimitiveType::parse(other) {
                Some(primitive) => Ok(SchemaNode::new(SchemaKind::Primitive(primitive), meta)),
                None => Err(SchemaError::InvalidSchema {
                    reason: format!("unknown type '{other}'"),
                }),
            },
        }
    }

    /// `type: ["string", "null"]` becomes a union of one node per listed type
    fn resolve_type_array(
        &mut self,
        obj: &Map<String, Value>,
        types: &[Value],
        meta: SchemaMeta,
    ) -> Result<SchemaNode, SchemaError> {
        let names = types
            .iter()
            .map(|t| {
                t.as_str().ok_or_else(|| SchemaError::InvalidSchema {
                    reason: format!("'type' entries must be strings, found {t}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match names.as_slice() {
            [] => Ok(SchemaNode::new(SchemaKind::Any, meta)),
            [single] => self.resolve_typed(obj, single, meta),
            _ => {
                let mut variants = Vec::with_capacity(names.len());
                for name in names {
                    variants.push(self.resolve_typed(obj, name, SchemaMeta::default())?);
                }
                Ok(SchemaNode::new(
                    SchemaKind::Union(UnionNode {
                        mode: UnionMode::AnyOf,
                        variants,
                    }),
                    meta,
                ))
            }
        }
    }

    fn resolve_object(
        &mut self,
        obj: &Map<String, Value>,
        meta: SchemaMeta,
    ) -> Result<SchemaNode, SchemaError> {
        let mut node = ObjectNode::default();

        if let Some(props) = obj.get("properties") {
            let props = props.as_object().ok_or_else(|| SchemaError::InvalidSchema {
                reason: "'properties' must be an object".to_string(),
            })?;
            for (name, schema) in props {
                let prop = self.resolve(schema)?;
                node.properties.push((name.clone(), prop));
            }
        }

        if let Some(required) = obj.get("required").and_then(Value::as_array) {
            node.required = required
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect();
        }

        node.additional = match obj.get("additionalProperties") {
            None | Some(Value::Bool(true)) => AdditionalProperties::Unspecified,
            Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
            Some(schema) => AdditionalProperties::Typed(Box::new(self.resolve(schema)?)),
        };

        Ok(SchemaNode::new(SchemaKind::Object(node), meta))
    }

    fn resolve_array(
        &mut self,
        obj: &Map<String, Value>,
        meta: SchemaMeta,
    ) -> Result<SchemaNode, SchemaError> {
        let items = match obj.get("items") {
            None => SchemaNode::any(),
            Some(Value::Array(_)) => {
                return Err(SchemaError::InvalidSchema {
                    reason: "tuple-style 'items' arrays are not supported".to_string(),
                })
            }
            Some(schema) => self.resolve(schema)?,
        };
        Ok(SchemaNode::new(SchemaKind::Array(Box::new(items)), meta))
    }

    fn resolve_union(
        &mut self,
        mode: UnionMode,
        branches: &Value,
        meta: SchemaMeta,
    ) -> Result<SchemaNode, SchemaError> {
        let branches = composition_branches(mode.keyword(), branches)?;
        let mut variants = Vec::with_capacity(branches.len());
        for branch in branches {
            variants.push(self.resolve(branch)?);
        }
        Ok(SchemaNode::new(
            SchemaKind::Union(UnionNode { mode, variants }),
            meta,
        ))
    }

    /// Merge `allOf` branches into one object.
    ///
    /// Properties from later branches replace earlier ones of the same name but
    /// keep the earlier position. `required` is the union over all branches.
    /// Sibling `properties`/`required` next to `allOf` act as one more, final branch.
    fn resolve_all_of(
        &mut self,
        obj: &Map<String, Value>,
        branches: &Value,
        meta: SchemaMeta,
    ) -> Result<SchemaNode, SchemaError> {
        let raw_branches = composition_branches("allOf", branches)?;
        let mut resolved = Vec::with_capacity(raw_branches.len() + 1);
        for branch in raw_branches {
            resolved.push(self.resolve(branch)?);
        }

        if obj.contains_key("properties") || obj.contains_key("required") {
            let mut siblings = obj.clone();
            siblings.remove("allOf");
            siblings.remove("title");
            siblings.remove("description");
            resolved.push(self.resolve_object(&siblings, SchemaMeta::default())?);
        }

        let meaningful: Vec<&SchemaNode> = resolved
            .iter()
            .map(SchemaNode::target)
            .filter(|n| n.kind != SchemaKind::Any)
            .collect();

        if meaningful.is_empty() {
            return Ok(SchemaNode::new(SchemaKind::Any, meta));
        }

        if let [single] = meaningful.as_slice() {
            if !matches!(single.kind, SchemaKind::Object(_)) {
                let mut node = (*single).clone();
                let inner = std::mem::replace(&mut node.meta, meta);
                node.meta.fill_from(&inner);
                return Ok(node);
            }
        }

        let mut merged = ObjectNode::default();
        for (index, branch) in meaningful.iter().enumerate() {
            let SchemaKind::Object(part) = &branch.kind else {
                return Err(SchemaError::InvalidComposition {
                    keyword: "allOf",
                    reason: format!("branch {index} is not an object schema"),
                });
            };
            for (name, prop) in &part.properties {
                merged.set_property(name.clone(), prop.clone());
            }
            merged.required.extend(part.required.iter().cloned());
            if part.additional != AdditionalProperties::Unspecified {
                merged.additional = part.additional.clone();
            }
        }

        Ok(SchemaNode::new(SchemaKind::Object(merged), meta))
    }
}

fn composition_branches<'v>(
    keyword: &'static str,
    branches: &'v Value,
) -> Result<&'v Vec<Value>, SchemaError> {
    match branches.as_array() {
        Some(list) if !list.is_empty() => Ok(list),
        Some(_) => Err(SchemaError::InvalidComposition {
            keyword,
            reason: "no branches".to_string(),
        }),
        None => Err(SchemaError::InvalidComposition {
            keyword,
            reason: "must be an array of schemas".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn components(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_component_name_decodes_pointer_escapes() {
        assert_eq!(
            component_name("#/components/schemas/Pet").as_deref(),
            Some("Pet")
        );
        assert_eq!(
            component_name("#/components/schemas/a~1b~0c").as_deref(),
            Some("a/b~c")
        );
        assert_eq!(component_name("other.json#/Pet"), None);
        assert_eq!(component_name("#/components/responses/Pet"), None);
    }

    #[test]
    fn test_two_node_cycle_is_reported_with_chain() {
        let comps = components(json!({
            "A": {"type": "object", "properties": {"b": {"$ref": "#/components/schemas/B"}}},
            "B": {"type": "object", "properties": {"a": {"$ref": "#/components/schemas/A"}}}
        }));
        let mut resolver = SchemaResolver::from_components(Some(&comps));
        let err = resolver.resolve_component("A").unwrap_err();
        assert_eq!(
            err,
            SchemaError::CircularReference {
                chain: vec!["A".into(), "B".into(), "A".into()]
            }
        );
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let comps = components(json!({
            "Node": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
        }));
        let mut resolver = SchemaResolver::from_components(Some(&comps));
        assert!(matches!(
            resolver.resolve_component("Node"),
            Err(SchemaError::CircularReference { .. })
        ));
    }

    #[test]
    fn test_shared_reference_is_not_a_cycle() {
        let comps = components(json!({
            "Tag": {"type": "string"},
            "Pet": {
                "type": "object",
                "properties": {
                    "first": {"$ref": "#/components/schemas/Tag"},
                    "second": {"$ref": "#/components/schemas/Tag"}
                }
            }
        }));
        let mut resolver = SchemaResolver::from_components(Some(&comps));
        let pet = resolver.resolve_component("Pet").unwrap();
        let obj = pet.as_object().unwrap();
        assert_eq!(obj.properties.len(), 2);
        assert_eq!(obj.property("second").unwrap().reference_target(), Some("Tag"));
    }

    #[test]
    fn test_missing_reference() {
        let mut resolver = SchemaResolver::from_components(None);
        let err = resolver
            .resolve(&json!({"$ref": "#/components/schemas/Ghost"}))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnresolvedReference {
                reference: "#/components/schemas/Ghost".into()
            }
        );
    }

    #[test]
    fn test_all_of_merges_required_sets() {
        let comps = components(json!({
            "Base": {"type": "object", "properties": {"a": {"type": "string"}}, "required": ["a"]}
        }));
        let mut resolver = SchemaResolver::from_components(Some(&comps));
        let node = resolver
            .resolve(&json!({
                "title": "Combined",
                "allOf": [
                    {"$ref": "#/components/schemas/Base"},
                    {"type": "object", "properties": {"b": {"type": "integer"}}}
                ]
            }))
            .unwrap();

        assert_eq!(node.meta.title.as_deref(), Some("Combined"));
        let obj = node.as_object().unwrap();
        let names: Vec<_> = obj.properties.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(obj.required.contains("a"));
        assert!(!obj.required.contains("b"));
    }

    #[test]
    fn test_all_of_later_branch_wins_on_conflict() {
        let mut resolver = SchemaResolver::from_components(None);
        let node = resolver
            .resolve(&json!({
                "allOf": [
                    {"type": "object", "properties": {"x": {"type": "string"}, "y": {"type": "string"}}},
                    {"type": "object", "properties": {"x": {"type": "integer"}}}
                ]
            }))
            .unwrap();
        let obj = node.as_object().unwrap();
        assert_eq!(obj.properties[0].0, "x");
        assert_eq!(
            obj.properties[0].1.kind,
            SchemaKind::Primitive(PrimitiveType::Integer)
        );
    }

    #[test]
    fn test_all_of_with_non_object_branches_is_rejected() {
        let mut resolver = SchemaResolver::from_components(None);
        let err = resolver
            .resolve(&json!({"allOf": [{"type": "string"}, {"type": "object"}]}))
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidComposition { keyword: "allOf", .. }
        ));
    }

    #[test]
    fn test_single_primitive_all_of_collapses() {
        let mut resolver = SchemaResolver::from_components(None);
        let node = resolver
            .resolve(&json!({"description": "an id", "allOf": [{"type": "string", "format": "uuid"}]}))
            .unwrap();
        assert_eq!(node.kind, SchemaKind::Primitive(PrimitiveType::String));
        assert_eq!(node.meta.description.as_deref(), Some("an id"));
        assert_eq!(node.meta.format.as_deref(), Some("uuid"));
    }

    #[test]
    fn test_type_array_becomes_union() {
        let mut resolver = SchemaResolver::from_components(None);
        let node = resolver
            .resolve(&json!({"type": ["string", "null"]}))
            .unwrap();
        match node.kind {
            SchemaKind::Union(union) => {
                assert_eq!(union.mode, UnionMode::AnyOf);
                assert_eq!(union.variants.len(), 2);
            }
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn test_tuple_items_rejected() {
        let mut resolver = SchemaResolver::from_components(None);
        let err = resolver
            .resolve(&json!({"type": "array", "items": [{"type": "string"}]}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema { .. }));
    }

    #[test]
    fn test_constraints_are_carried() {
        let mut resolver = SchemaResolver::from_components(None);
        let node = resolver
            .resolve(&json!({"type": "string", "maxLength": 10, "nullable": true, "example": "abc"}))
            .unwrap();
        assert_eq!(node.meta.constraints.get("maxLength"), Some(&json!(10)));
        assert!(node.meta.nullable);
        assert_eq!(node.meta.example, Some(json!("abc")));
    }
}
