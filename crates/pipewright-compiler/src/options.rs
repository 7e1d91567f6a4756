//! Compiler options

use crate::error::{CompileError, Result};
use serde::{Deserialize, Serialize};

/// Hard platform ceiling on the number of jobs a matrix may expand to
pub const MATRIX_JOB_LIMIT: u64 = 256;

/// Compiler options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Mandatory extension of source files named in imports (without the dot)
    pub source_extension: String,

    /// Matrix job count above which a warning is reported
    pub matrix_warning_threshold: u64,

    /// Largest edit distance for which a "did you mean" hint is offered
    pub max_suggestion_distance: usize,

    /// Action reference used to run agent jobs and agent-task steps
    pub agent_action: String,

    /// Largest number of iterations a cycle is unrolled into
    pub max_cycle_iterations: u32,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            source_extension: "flow".to_string(),
            matrix_warning_threshold: 200,
            max_suggestion_distance: 2,
            agent_action: "pipewright/agent-task@v1".to_string(),
            max_cycle_iterations: 256,
        }
    }
}

impl CompilerOptions {
    /// Load options from YAML. Missing fields take their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let options: CompilerOptions = serde_yaml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Check option values against each other and the platform limits
    pub fn validate(&self) -> Result<()> {
        if self.source_extension.is_empty() || self.source_extension.starts_with('.') {
            return Err(CompileError::Config(format!(
                "source_extension must be a bare extension such as 'flow', got '{}'",
                self.source_extension
            )));
        }
        if self.matrix_warning_threshold > MATRIX_JOB_LIMIT {
            return Err(CompileError::Config(format!(
                "matrix_warning_threshold ({}) exceeds the platform job limit ({})",
                self.matrix_warning_threshold, MATRIX_JOB_LIMIT
            )));
        }
        if self.agent_action.trim().is_empty() {
            return Err(CompileError::Config("agent_action must not be empty".to_string()));
        }
        if self.max_cycle_iterations == 0 {
            return Err(CompileError::Config(
                "max_cycle_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_matrix_warning_threshold(mut self, threshold: u64) -> Self {
        self.matrix_warning_threshold = threshold;
        self
    }

    pub fn with_source_extension(mut self, extension: impl Into<String>) -> Self {
        self.source_extension = extension.into();
        self
    }
}
