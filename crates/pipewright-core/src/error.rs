//! Error types for pipewright Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// The YAML interchange form of an AST could not be decoded
    #[error("Invalid AST (yaml): {0}")]
    YamlInterchange(#[from] serde_yaml::Error),

    /// The JSON interchange form of an AST could not be decoded
    #[error("Invalid AST (json): {0}")]
    JsonInterchange(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
