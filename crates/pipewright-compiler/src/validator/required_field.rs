//! Required fields: execution targets, cycle termination, agent task specs

use crate::validator::{ValidationContext, Validator};
use pipewright_core::ast::{AgentTask, JobKind, StepNode, WorkflowNode};
use pipewright_core::{Diagnostic, DiagnosticCode, Span};

/// Checks that every construct declares the fields it cannot run without
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredFieldValidator;

impl RequiredFieldValidator {
    pub fn check(&self, workflow: &WorkflowNode) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for job in &workflow.jobs {
            if is_blank(job.target.as_deref()) {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::MISSING_TARGET,
                        format!("{} '{}' does not declare an execution target", job.kind_name(), job.name),
                        job.span.clone(),
                    )
                    .with_hint("add a target, e.g. `runs-on: ubuntu-latest`"),
                );
            }
            match &job.kind {
                JobKind::Agent { task } => check_task(task, &job.name, &job.span, &mut diagnostics),
                JobKind::Plain { steps } | JobKind::Matrix { steps, .. } => {
                    check_steps(steps, &mut diagnostics)
                }
            }
        }

        for cycle in &workflow.cycles {
            if is_blank(cycle.target.as_deref()) {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::MISSING_TARGET,
                    format!("cycle '{}' does not declare an execution target", cycle.name),
                    cycle.span.clone(),
                ));
            }
            if cycle.until.is_none() && cycle.max_iterations.is_none() {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::MISSING_TERMINATION,
                        format!("cycle '{}' has no termination condition", cycle.name),
                        cycle.span.clone(),
                    )
                    .with_hint("declare a stop predicate (`until`) or an iteration ceiling (`max_iterations`)"),
                );
            }
            check_steps(&cycle.steps, &mut diagnostics);
        }

        diagnostics
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

fn check_steps(steps: &[StepNode], diagnostics: &mut Vec<Diagnostic>) {
    for step in steps {
        match step {
            StepNode::AgentTask(agent) => {
                let owner = agent.name.as_deref().unwrap_or("agent task");
                check_task(&agent.task, owner, &agent.span, diagnostics);
            }
            StepNode::Guard(guard) => check_steps(&guard.steps, diagnostics),
            StepNode::Shell(_) | StepNode::Uses(_) => {}
        }
    }
}

fn check_task(task: &AgentTask, owner: &str, span: &Span, diagnostics: &mut Vec<Diagnostic>) {
    if is_blank(task.prompt.as_deref()) {
        diagnostics.push(Diagnostic::error(
            DiagnosticCode::MISSING_PROMPT,
            format!("agent task '{}' has no prompt", owner),
            span.clone(),
        ));
    }
    if task.output.is_none() {
        diagnostics.push(Diagnostic::error(
            DiagnosticCode::MISSING_OUTPUT_SCHEMA,
            format!("agent task '{}' has no output schema", owner),
            span.clone(),
        ));
    }
}

impl Validator for RequiredFieldValidator {
    fn name(&self) -> &'static str {
        "required-field"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        match &ctx.file.workflow {
            Some(workflow) => self.check(workflow),
            None => Vec::new(),
        }
    }
}
