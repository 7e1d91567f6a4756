//! Compiler error types
//!
//! These are failures of the compiler as a library (bad options, a missing
//! entry file). Problems in the compiled sources are never errors; they are
//! reported as diagnostics on the `CompileResult`.

use pipewright_core::CoreError;
use thiserror::Error;

/// Compiler error
#[derive(Error, Debug)]
pub enum CompileError {
    /// Invalid compiler configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration could not be decoded
    #[error("Configuration error: {0}")]
    ConfigFormat(#[from] serde_yaml::Error),

    /// The entry file handed to the compiler does not exist
    #[error("Entry file not found: {path}")]
    EntryNotFound { path: String },

    /// AST interchange failure
    #[error("Front end error: {0}")]
    Frontend(#[from] CoreError),

    /// Output could not be serialized
    #[error("Emit error: {0}")]
    Emit(serde_yaml::Error),
}

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;
