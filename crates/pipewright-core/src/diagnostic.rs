//! Diagnostics reported by the compiler
//!
//! Every problem found in user input is reported as a [`Diagnostic`] rather
//! than a Rust error. Codes are grouped into disjoint numeric ranges, one per
//! [`Category`], so a host can filter or document them by range.

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(s)
    }
}

/// Diagnostic category. Each category owns one code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Structural,
    ImportPath,
    TypeSystem,
    Schema,
    RequiredField,
    CycleTermination,
    MatrixLimit,
    ExpressionType,
}

impl Category {
    /// Inclusive code range owned by this category
    pub fn range(self) -> (u16, u16) {
        match self {
            Category::Structural => (1000, 1999),
            Category::ImportPath => (2000, 2999),
            Category::TypeSystem => (3000, 3999),
            Category::Schema => (4000, 4999),
            Category::RequiredField => (5000, 5999),
            Category::CycleTermination => (6000, 6999),
            Category::MatrixLimit => (7000, 7999),
            Category::ExpressionType => (8000, 8999),
        }
    }

    pub const ALL: [Category; 8] = [
        Category::Structural,
        Category::ImportPath,
        Category::TypeSystem,
        Category::Schema,
        Category::RequiredField,
        Category::CycleTermination,
        Category::MatrixLimit,
        Category::ExpressionType,
    ];
}

/// Numeric diagnostic code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticCode(pub u16);

impl DiagnosticCode {
    // Structural
    pub const INVALID_STRUCTURE: Self = Self(1001);
    pub const DUPLICATE_JOB: Self = Self(1002);
    pub const EMPTY_NAME: Self = Self(1003);
    pub const UNKNOWN_NEEDS: Self = Self(1004);
    pub const JOB_DEPENDENCY_CYCLE: Self = Self(1005);
    pub const EMPTY_STEPS: Self = Self(1006);
    pub const EMPTY_GUARD: Self = Self(1007);

    // Import / path
    pub const UNRESOLVED_IMPORT: Self = Self(2001);
    pub const CIRCULAR_IMPORT: Self = Self(2002);
    pub const ABSOLUTE_IMPORT: Self = Self(2003);
    pub const IMPORT_ESCAPES_ROOT: Self = Self(2004);
    pub const MISSING_EXTENSION: Self = Self(2005);
    pub const DEPENDENCY_UNAVAILABLE: Self = Self(2006);

    // Type system
    pub const DUPLICATE_TYPE: Self = Self(3001);
    pub const UNDEFINED_TYPE: Self = Self(3002);
    pub const UNKNOWN_PROPERTY: Self = Self(3003);
    pub const UNKNOWN_IMPORTED_NAME: Self = Self(3004);
    pub const BINDING_COLLISION: Self = Self(3005);

    // Schema
    pub const UNKNOWN_PRIMITIVE: Self = Self(4001);
    pub const EMPTY_OBJECT: Self = Self(4002);
    pub const DUPLICATE_FIELD: Self = Self(4003);
    pub const SUSPICIOUS_UNION: Self = Self(4004);

    // Required field
    pub const MISSING_TARGET: Self = Self(5001);
    pub const MISSING_TERMINATION: Self = Self(5002);
    pub const MISSING_PROMPT: Self = Self(5003);
    pub const MISSING_OUTPUT_SCHEMA: Self = Self(5004);

    // Cycle termination
    pub const UNBOUNDED_CYCLE: Self = Self(6001);
    pub const ZERO_ITERATIONS: Self = Self(6002);
    pub const ITERATION_CEILING_TOO_HIGH: Self = Self(6003);

    // Matrix limit
    pub const MATRIX_OVER_LIMIT: Self = Self(7001);
    pub const MATRIX_OVER_THRESHOLD: Self = Self(7002);
    pub const MATRIX_EMPTY_AXIS: Self = Self(7003);
    pub const MATRIX_ZERO_PARALLEL: Self = Self(7004);

    // Expression type
    pub const INCOMPATIBLE_COMPARISON: Self = Self(8001);
    pub const NON_NUMERIC_ARITHMETIC: Self = Self(8002);

    /// Category whose range contains this code
    pub fn category(self) -> Option<Category> {
        Category::ALL.into_iter().find(|c| {
            let (lo, hi) = c.range();
            (lo..=hi).contains(&self.0)
        })
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PW{:04}", self.0)
    }
}

/// A single diagnostic.
///
/// Diagnostics are immutable once published; the `with_*` builders consume
/// the value and are only meant to be used while constructing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    code: DiagnosticCode,
    severity: Severity,
    message: String,
    span: Span,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl Diagnostic {
    pub fn new(
        code: DiagnosticCode,
        severity: Severity,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            span,
            hint: None,
        }
    }

    /// Create a new error diagnostic
    pub fn error(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::new(code, Severity::Error, message, span)
    }

    /// Create a new warning diagnostic
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::new(code, Severity::Warning, message, span)
    }

    /// Create a new informational diagnostic
    pub fn info(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::new(code, Severity::Info, message, span)
    }

    /// Attach a hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a hint only when one is available
    pub fn with_optional_hint(mut self, hint: Option<String>) -> Self {
        self.hint = hint;
        self
    }

    pub fn code(&self) -> DiagnosticCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn category(&self) -> Option<Category> {
        self.code.category()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {}: {}",
            self.severity, self.code, self.span, self.message
        )?;
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {})", hint)?;
        }
        Ok(())
    }
}
