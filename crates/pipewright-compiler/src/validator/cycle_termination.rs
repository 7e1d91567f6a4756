//! Termination safety of cycles
//!
//! A cycle with no termination at all is a required-field error; this
//! validator only looks at cycles that declare something.

use crate::validator::{ValidationContext, Validator};
use pipewright_core::ast::WorkflowNode;
use pipewright_core::{Diagnostic, DiagnosticCode};

#[derive(Debug, Clone, Copy, Default)]
pub struct CycleTerminationValidator;

impl CycleTerminationValidator {
    pub fn check(&self, workflow: &WorkflowNode, max_cycle_iterations: u32) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for cycle in &workflow.cycles {
            match (cycle.until.is_some(), cycle.max_iterations) {
                (true, None) => diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::UNBOUNDED_CYCLE,
                        format!(
                            "cycle '{}' has a stop predicate but no iteration ceiling and may never end",
                            cycle.name
                        ),
                        cycle.span.clone(),
                    )
                    .with_hint(format!(
                        "add `max_iterations`; without it the cycle is unrolled {} times",
                        max_cycle_iterations
                    )),
                ),
                (_, Some(0)) => diagnostics.push(Diagnostic::error(
                    DiagnosticCode::ZERO_ITERATIONS,
                    format!("cycle '{}' allows zero iterations", cycle.name),
                    cycle.span.clone(),
                )),
                (_, Some(n)) if n > max_cycle_iterations => diagnostics.push(Diagnostic::error(
                    DiagnosticCode::ITERATION_CEILING_TOO_HIGH,
                    format!(
                        "cycle '{}' allows {} iterations, more than the limit of {}",
                        cycle.name, n, max_cycle_iterations
                    ),
                    cycle.span.clone(),
                )),
                _ => {}
            }
        }

        diagnostics
    }
}

impl Validator for CycleTerminationValidator {
    fn name(&self) -> &'static str {
        "cycle-termination"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        match &ctx.file.workflow {
            Some(workflow) => self.check(workflow, ctx.options.max_cycle_iterations),
            None => Vec::new(),
        }
    }
}
