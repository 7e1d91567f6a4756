//! pipewright Compiler - workflow AST to GitHub Actions YAML
//!
//! This crate compiles pipewright workflow ASTs, across their imports, into
//! workflow YAML plus diagnostics.

pub mod codegen;
pub mod compiler;
pub mod error;
pub mod frontend;
pub mod graph;
pub mod import;
pub mod matrix;
pub mod options;
pub mod semantic;
pub mod validator;

// Re-export main types
pub use compiler::{CompileResult, Compiler};
pub use error::{CompileError, Result};
pub use frontend::{FileResolver, Frontend, InterchangeFrontend};
pub use options::{CompilerOptions, MATRIX_JOB_LIMIT};

// Re-export pass types
pub use codegen::{ConditionCompiler, IrTransform, YamlEmitter};
pub use graph::Digraph;
pub use import::{ImportEdge, ImportGraph, PathResolver};
pub use matrix::{MatrixCount, MatrixExpander};
pub use semantic::{FileSnapshot, ResolvedType, TypeChecker, TypeRegistry};
pub use validator::{default_validators, ValidationContext, Validator};
