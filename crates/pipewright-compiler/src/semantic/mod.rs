//! Semantic analysis module
//!
//! Type resolution across files and type checking of output paths.

pub mod suggest;
pub mod type_checker;
pub mod type_registry;

pub use suggest::{did_you_mean, suggest};
pub use type_checker::{lookup_path, PathLookup, TypeChecker};
pub use type_registry::{FileSnapshot, ResolvedType, TypeDefinition, TypeId, TypeRegistry};
