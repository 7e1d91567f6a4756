//! YAML emitter
//!
//! Writes a [`WorkflowIR`] as a GitHub Actions workflow. The IR's serde
//! shape is the workflow file, so output is a pure function of the IR:
//! keys follow field order, jobs follow IR order, multi-line scripts become
//! literal block scalars and strings that would read back as another type
//! are quoted.

use crate::error::{CompileError, Result};
use pipewright_core::ir::WorkflowIR;

#[derive(Debug, Default, Clone, Copy)]
pub struct YamlEmitter;

impl YamlEmitter {
    pub fn emit(&self, workflow: &WorkflowIR) -> Result<String> {
        serde_yaml::to_string(workflow).map_err(CompileError::Emit)
    }
}
