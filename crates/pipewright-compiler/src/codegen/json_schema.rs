//! JSON Schema rendering of structural types
//!
//! Agent tasks receive their output schema as compact JSON Schema. Named
//! types are inlined. Keys come out sorted, so the text is deterministic.

use crate::semantic::type_registry::{FileSnapshot, ResolvedType};
use pipewright_core::ast::Primitive;
use serde_json::{json, Map, Value};

/// Inlining stops at this depth (recursive types)
const MAX_INLINE_DEPTH: usize = 32;

/// JSON Schema for a resolved type
pub fn to_json_schema(ty: &ResolvedType, types: &FileSnapshot) -> Value {
    schema(ty, types, 0)
}

fn schema(ty: &ResolvedType, types: &FileSnapshot, depth: usize) -> Value {
    if depth > MAX_INLINE_DEPTH {
        return json!({});
    }
    match ty {
        ResolvedType::Object(fields) => {
            let mut properties = Map::new();
            for (name, field) in fields {
                properties.insert(name.clone(), schema(field, types, depth + 1));
            }
            let required: Vec<Value> = fields.keys().map(|k| Value::String(k.clone())).collect();
            json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            })
        }
        ResolvedType::Array(item) => json!({
            "type": "array",
            "items": schema(item, types, depth + 1),
        }),
        ResolvedType::Union(members) => {
            let enumeration: Option<Vec<Value>> = members
                .iter()
                .map(|m| match m {
                    ResolvedType::Literal(value) => Some(Value::String(value.clone())),
                    ResolvedType::Null => Some(Value::Null),
                    _ => None,
                })
                .collect();
            match enumeration {
                Some(values) => json!({ "enum": values }),
                None => {
                    let any_of: Vec<Value> =
                        members.iter().map(|m| schema(m, types, depth + 1)).collect();
                    json!({ "anyOf": any_of })
                }
            }
        }
        ResolvedType::Primitive(primitive) => match primitive {
            Primitive::String | Primitive::Path => json!({ "type": "string" }),
            Primitive::Int => json!({ "type": "integer" }),
            Primitive::Float => json!({ "type": "number" }),
            Primitive::Bool => json!({ "type": "boolean" }),
            Primitive::Json => json!({}),
        },
        ResolvedType::Literal(value) => json!({ "const": value }),
        ResolvedType::Null => json!({ "type": "null" }),
        ResolvedType::Named(_) => schema(types.expand(ty), types, depth + 1),
        ResolvedType::Unknown => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::type_registry::TypeRegistry;
    use pipewright_core::ast::{SchemaTypeNode, TypeDeclarationNode};
    use std::collections::BTreeMap;

    #[test]
    fn test_object_with_enum_field() {
        let decls = vec![TypeDeclarationNode::new(
            "Review",
            SchemaTypeNode::object([
                (
                    "verdict",
                    SchemaTypeNode::union(vec![
                        SchemaTypeNode::literal("approve"),
                        SchemaTypeNode::literal("reject"),
                    ]),
                ),
                ("score", SchemaTypeNode::primitive("float")),
            ]),
        )];
        let (types, _) = TypeRegistry::new(2).register("a.flow", &decls, &[], &BTreeMap::new());
        let ty = types.link(&SchemaTypeNode::reference("Review"));

        let schema = to_json_schema(&ty, &types);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["verdict"]["enum"][1], "reject");
        assert_eq!(schema["properties"]["score"]["type"], "number");
        assert_eq!(schema["required"], json!(["verdict", "score"]));
    }

    #[test]
    fn test_nullable_array() {
        let types = FileSnapshot::empty("a.flow");
        let ty = types.link(&SchemaTypeNode::union(vec![
            SchemaTypeNode::array(SchemaTypeNode::primitive("path")),
            SchemaTypeNode::Null,
        ]));
        assert_eq!(
            to_json_schema(&ty, &types).to_string(),
            r#"{"anyOf":[{"items":{"type":"string"},"type":"array"},{"type":"null"}]}"#
        );
    }
}
