//! Structural type declarations
//!
//! Types are identified by their shape. Named types are declared with
//! [`TypeDeclarationNode`] and referenced with [`SchemaTypeNode::Reference`].

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `type Report = { status: string, score: int }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDeclarationNode {
    pub name: String,

    #[serde(default)]
    pub span: Span,

    pub body: SchemaTypeNode,
}

/// Body of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaTypeNode {
    /// Object with ordered fields
    Object { fields: Vec<FieldNode> },

    /// Array of a single item type
    Array { item: Box<SchemaTypeNode> },

    /// Union of member types
    Union { members: Vec<SchemaTypeNode> },

    /// Primitive type, spelled as written in the source
    Primitive { name: String },

    /// String constant
    Literal { value: String },

    /// The null type
    Null,

    /// Reference to a named type
    Reference { name: String },
}

/// One field of an object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: SchemaTypeNode,

    #[serde(default)]
    pub span: Span,
}

/// The fixed set of recognized primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Int,
    Float,
    Bool,
    Path,
    Json,
}

impl Primitive {
    pub const ALL: [Primitive; 6] = [
        Primitive::String,
        Primitive::Int,
        Primitive::Float,
        Primitive::Bool,
        Primitive::Path,
        Primitive::Json,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Bool => "bool",
            Primitive::Path => "path",
            Primitive::Json => "json",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Primitive::Int | Primitive::Float)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TypeDeclarationNode {
    pub fn new(name: impl Into<String>, body: SchemaTypeNode) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
            body,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl SchemaTypeNode {
    pub fn primitive(name: impl Into<String>) -> Self {
        SchemaTypeNode::Primitive { name: name.into() }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        SchemaTypeNode::Reference { name: name.into() }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        SchemaTypeNode::Literal {
            value: value.into(),
        }
    }

    pub fn array(item: SchemaTypeNode) -> Self {
        SchemaTypeNode::Array {
            item: Box::new(item),
        }
    }

    pub fn union(members: Vec<SchemaTypeNode>) -> Self {
        SchemaTypeNode::Union { members }
    }

    /// Object type from `(name, type)` pairs
    pub fn object<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, SchemaTypeNode)>,
        S: Into<String>,
    {
        SchemaTypeNode::Object {
            fields: fields
                .into_iter()
                .map(|(name, ty)| FieldNode {
                    name: name.into(),
                    ty,
                    span: Span::default(),
                })
                .collect(),
        }
    }

    /// Visit this node and every nested node, parents first
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a SchemaTypeNode)) {
        f(self);
        match self {
            SchemaTypeNode::Object { fields } => {
                for field in fields {
                    field.ty.walk(f);
                }
            }
            SchemaTypeNode::Array { item } => item.walk(f),
            SchemaTypeNode::Union { members } => {
                for member in members {
                    member.walk(f);
                }
            }
            SchemaTypeNode::Primitive { .. }
            | SchemaTypeNode::Literal { .. }
            | SchemaTypeNode::Null
            | SchemaTypeNode::Reference { .. } => {}
        }
    }
}

impl fmt::Display for SchemaTypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaTypeNode::Object { fields } => {
                f.write_str("{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.ty)?;
                }
                f.write_str(" }")
            }
            SchemaTypeNode::Array { item } => write!(f, "{}[]", item),
            SchemaTypeNode::Union { members } => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
            SchemaTypeNode::Primitive { name } => f.write_str(name),
            SchemaTypeNode::Literal { value } => write!(f, "\"{}\"", value),
            SchemaTypeNode::Null => f.write_str("null"),
            SchemaTypeNode::Reference { name } => f.write_str(name),
        }
    }
}
