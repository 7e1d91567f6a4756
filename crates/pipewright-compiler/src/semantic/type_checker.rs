//! Type checker
//!
//! Checks every type written in a workflow (job outputs, agent output
//! schemas) against the file's type snapshot, and checks property paths
//! into typed job outputs against the declared object fields.
//!
//! Property paths have the shape `needs.<job>.outputs.<output>.<field>...`
//! (or `jobs.` in place of `needs.`). Paths of any other shape are runtime
//! context and are not checked.

use crate::semantic::suggest::{did_you_mean, suggest};
use crate::semantic::type_registry::{FileSnapshot, ResolvedType};
use crate::validator::{ValidationContext, Validator};
use pipewright_core::ast::{Expression, JobKind, StepNode, WorkflowNode};
use pipewright_core::{Diagnostic, DiagnosticCode, Span};

/// Result of looking up the declared type of a property path
#[derive(Debug, Clone, PartialEq)]
pub enum PathLookup {
    /// The path does not point into a typed job output
    Untyped,

    /// Declared type of the value at the end of the path
    Typed(ResolvedType),

    /// The job exists but declares no such output
    UnknownOutput {
        job: String,
        output: String,
        suggestion: Option<String>,
    },

    /// A segment names a field the object type does not declare
    UnknownField {
        owner: String,
        field: String,
        suggestion: Option<String>,
    },
}

/// Declared type of a property path
pub fn lookup_path(
    workflow: &WorkflowNode,
    types: &FileSnapshot,
    segments: &[String],
    max_suggestion_distance: usize,
) -> PathLookup {
    let [root, job_name, outputs, output_name, fields @ ..] = segments else {
        return PathLookup::Untyped;
    };
    if (root != "needs" && root != "jobs") || outputs != "outputs" {
        return PathLookup::Untyped;
    }
    let Some(job) = workflow.job(job_name) else {
        return PathLookup::Untyped;
    };
    let Some(decl) = job.outputs.iter().find(|o| &o.name == output_name) else {
        return PathLookup::UnknownOutput {
            job: job.name.clone(),
            output: output_name.clone(),
            suggestion: suggest(
                output_name,
                job.outputs.iter().map(|o| o.name.as_str()),
                max_suggestion_distance,
            ),
        };
    };

    let mut current = types.link(&decl.ty);
    for field in fields {
        let mut expanded = types.expand(&current);
        if let ResolvedType::Union(members) = expanded {
            match ResolvedType::non_null_member(members) {
                Some(inner) => expanded = types.expand(inner),
                None => return PathLookup::Untyped,
            }
        }
        let next = match expanded {
            ResolvedType::Object(object) => match object.get(field) {
                Some(ty) => ty.clone(),
                None => {
                    return PathLookup::UnknownField {
                        owner: current.to_string(),
                        field: field.clone(),
                        suggestion: suggest(
                            field,
                            object.keys().map(String::as_str),
                            max_suggestion_distance,
                        ),
                    }
                }
            },
            // Primitives, arrays and json stop static checking
            _ => return PathLookup::Untyped,
        };
        current = next;
    }
    PathLookup::Typed(current)
}

/// Type-checks the types and property paths of a workflow
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeChecker;

impl TypeChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check a workflow against the file's types
    pub fn check(
        &self,
        workflow: &WorkflowNode,
        types: &FileSnapshot,
        max_distance: usize,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for job in &workflow.jobs {
            for output in &job.outputs {
                let span = prefer(&output.span, &job.span);
                diagnostics.extend(types.link_checked(&output.ty, span, max_distance).1);
            }
            match &job.kind {
                JobKind::Agent { task } => {
                    if let Some(schema) = &task.output {
                        diagnostics.extend(types.link_checked(schema, &job.span, max_distance).1);
                    }
                }
                JobKind::Plain { steps } | JobKind::Matrix { steps, .. } => {
                    self.check_steps(steps, types, max_distance, &mut diagnostics);
                }
            }
            if let Some(condition) = &job.condition {
                self.check_paths(condition, workflow, types, &job.span, max_distance, &mut diagnostics);
            }
        }

        for cycle in &workflow.cycles {
            self.check_steps(&cycle.steps, types, max_distance, &mut diagnostics);
            if let Some(until) = &cycle.until {
                self.check_paths(until, workflow, types, &cycle.span, max_distance, &mut diagnostics);
            }
        }

        diagnostics
    }

    fn check_steps(
        &self,
        steps: &[StepNode],
        types: &FileSnapshot,
        max_distance: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for step in steps {
            match step {
                StepNode::AgentTask(agent) => {
                    if let Some(schema) = &agent.task.output {
                        diagnostics.extend(types.link_checked(schema, &agent.span, max_distance).1);
                    }
                }
                StepNode::Guard(guard) => {
                    self.check_steps(&guard.steps, types, max_distance, diagnostics)
                }
                StepNode::Shell(_) | StepNode::Uses(_) => {}
            }
        }
    }

    fn check_paths(
        &self,
        expr: &Expression,
        workflow: &WorkflowNode,
        types: &FileSnapshot,
        span: &Span,
        max_distance: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        expr.for_each_path(&mut |segments| {
            let path = segments.join(".");
            match lookup_path(workflow, types, segments, max_distance) {
                PathLookup::UnknownOutput {
                    job,
                    output,
                    suggestion,
                } => diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::UNKNOWN_PROPERTY,
                        format!("job '{}' has no output '{}' (in '{}')", job, output, path),
                        span.clone(),
                    )
                    .with_optional_hint(did_you_mean(suggestion)),
                ),
                PathLookup::UnknownField {
                    owner,
                    field,
                    suggestion,
                } => diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::UNKNOWN_PROPERTY,
                        format!("type '{}' has no property '{}' (in '{}')", owner, field, path),
                        span.clone(),
                    )
                    .with_optional_hint(did_you_mean(suggestion)),
                ),
                PathLookup::Untyped | PathLookup::Typed(_) => {}
            }
        });
    }
}

impl Validator for TypeChecker {
    fn name(&self) -> &'static str {
        "type-check"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        match &ctx.file.workflow {
            Some(workflow) => self.check(workflow, ctx.types, ctx.options.max_suggestion_distance),
            None => Vec::new(),
        }
    }
}

fn prefer<'a>(span: &'a Span, fallback: &'a Span) -> &'a Span {
    if span.is_unknown() {
        fallback
    } else {
        span
    }
}
