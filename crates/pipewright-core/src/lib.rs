//! pipewright Core - Core types and definitions for the pipewright workflow compiler
//!
//! This crate provides the fundamental types shared by the compiler:
//! - AST (Abstract Syntax Tree) definitions handed over by the front end
//! - IR (Intermediate Representation) definitions consumed by the emitter
//! - Diagnostics and source spans
//! - Scalar values used by matrices and expressions
//! - Error types

pub mod ast;
pub mod diagnostic;
pub mod error;
pub mod ir;
pub mod span;
pub mod value;

// Re-export commonly used types
pub use diagnostic::{Category, Diagnostic, DiagnosticCode, Severity};
pub use error::CoreError;
pub use span::Span;
pub use value::Scalar;
