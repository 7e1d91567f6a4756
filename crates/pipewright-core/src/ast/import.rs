//! Import declarations

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// `import { A, B as C } from "./types.flow"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDeclarationNode {
    /// Names pulled from the imported file, in source order
    pub names: Vec<ImportedName>,

    /// Import path as written
    pub source: String,

    #[serde(default)]
    pub span: Span,
}

/// One imported name with an optional local alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default)]
    pub span: Span,
}

impl ImportDeclarationNode {
    pub fn new(source: impl Into<String>, names: Vec<ImportedName>) -> Self {
        Self {
            names,
            source: source.into(),
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl ImportedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            span: Span::default(),
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
            span: Span::default(),
        }
    }

    /// Name under which the import is bound in the importing file
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}
