//! Workflow validators
//!
//! Each validator is a pure function of the source file, its type snapshot
//! and the compiler options, returning diagnostics in a stable order. All of
//! them run on every compile, whatever the others found, so one pass
//! surfaces every problem.

pub mod cycle_termination;
pub mod expression_type;
pub mod matrix_limit;
pub mod required_field;
pub mod schema;
pub mod structural;

pub use cycle_termination::CycleTerminationValidator;
pub use expression_type::ExpressionTypeValidator;
pub use matrix_limit::MatrixLimitValidator;
pub use required_field::RequiredFieldValidator;
pub use schema::SchemaValidator;
pub use structural::StructuralValidator;

use crate::options::CompilerOptions;
use crate::semantic::type_checker::TypeChecker;
use crate::semantic::type_registry::FileSnapshot;
use pipewright_core::ast::SourceFile;
use pipewright_core::Diagnostic;

/// Everything a validator may look at
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub file: &'a SourceFile,
    pub types: &'a FileSnapshot,
    pub options: &'a CompilerOptions,
}

impl<'a> ValidationContext<'a> {
    pub fn new(file: &'a SourceFile, types: &'a FileSnapshot, options: &'a CompilerOptions) -> Self {
        Self {
            file,
            types,
            options,
        }
    }
}

/// A single semantic check
pub trait Validator: Send + Sync {
    /// Short name, used in logs
    fn name(&self) -> &'static str;

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic>;
}

/// The full validator set, in reporting order
pub fn default_validators() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(StructuralValidator),
        Box::new(TypeChecker),
        Box::new(RequiredFieldValidator),
        Box::new(CycleTerminationValidator),
        Box::new(SchemaValidator),
        Box::new(ExpressionTypeValidator),
        Box::new(MatrixLimitValidator),
    ]
}

/// Run every validator and concatenate their findings
pub fn run_all(validators: &[Box<dyn Validator>], ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
    validators.iter().flat_map(|v| v.validate(ctx)).collect()
}
