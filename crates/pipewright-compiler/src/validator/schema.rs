//! Schema correctness of structural types

use crate::semantic::suggest::{did_you_mean, suggest};
use crate::validator::{ValidationContext, Validator};
use pipewright_core::ast::{JobKind, Primitive, SchemaTypeNode, SourceFile, StepNode};
use pipewright_core::{Diagnostic, DiagnosticCode, Span};
use std::collections::HashMap;

/// Checks every type written in a file: declarations, job outputs and
/// agent output schemas
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn check(&self, file: &SourceFile, max_distance: usize) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut visit = |node: &SchemaTypeNode, span: &Span| {
            check_node(node, span, max_distance, &mut diagnostics)
        };

        for decl in &file.types {
            visit(&decl.body, &decl.span);
        }

        if let Some(workflow) = &file.workflow {
            for job in &workflow.jobs {
                for output in &job.outputs {
                    let span = if output.span.is_unknown() { &job.span } else { &output.span };
                    visit(&output.ty, span);
                }
                match &job.kind {
                    JobKind::Agent { task } => {
                        if let Some(schema) = &task.output {
                            visit(schema, &job.span);
                        }
                    }
                    JobKind::Plain { steps } | JobKind::Matrix { steps, .. } => {
                        visit_steps(steps, &mut visit)
                    }
                }
            }
            for cycle in &workflow.cycles {
                visit_steps(&cycle.steps, &mut visit);
            }
        }

        diagnostics
    }
}

fn visit_steps(steps: &[StepNode], visit: &mut dyn FnMut(&SchemaTypeNode, &Span)) {
    for step in steps {
        match step {
            StepNode::AgentTask(agent) => {
                if let Some(schema) = &agent.task.output {
                    visit(schema, &agent.span);
                }
            }
            StepNode::Guard(guard) => visit_steps(&guard.steps, visit),
            StepNode::Shell(_) | StepNode::Uses(_) => {}
        }
    }
}

fn check_node(
    node: &SchemaTypeNode,
    span: &Span,
    max_distance: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match node {
        SchemaTypeNode::Primitive { name } => {
            if Primitive::from_name(name).is_none() {
                let hint = did_you_mean(suggest(
                    name,
                    Primitive::ALL.iter().map(|p| p.name()),
                    max_distance,
                ));
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::UNKNOWN_PRIMITIVE,
                        format!("unknown primitive type '{}'", name),
                        span.clone(),
                    )
                    .with_optional_hint(hint),
                );
            }
        }
        SchemaTypeNode::Object { fields } => {
            if fields.is_empty() {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::EMPTY_OBJECT,
                        "object type must declare at least one field",
                        span.clone(),
                    )
                    .with_hint("use `json` for an unstructured value"),
                );
            }
            let mut seen: HashMap<&str, &Span> = HashMap::new();
            for field in fields {
                let field_span = if field.span.is_unknown() { span } else { &field.span };
                if let Some(first) = seen.get(field.name.as_str()) {
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::DUPLICATE_FIELD,
                            format!("field '{}' is declared more than once", field.name),
                            field_span.clone(),
                        )
                        .with_hint(format!("first declared at {}", first)),
                    );
                } else {
                    seen.insert(&field.name, field_span);
                }
                check_node(&field.ty, field_span, max_distance, diagnostics);
            }
        }
        SchemaTypeNode::Array { item } => check_node(item, span, max_distance, diagnostics),
        SchemaTypeNode::Union { members } => {
            if !is_nullable(members) && !is_enumeration(members) {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::SUSPICIOUS_UNION,
                        format!(
                            "union '{}' is neither a nullable type nor a string-literal enumeration",
                            node
                        ),
                        span.clone(),
                    )
                    .with_hint("unions are meant for `T | null` or `\"a\" | \"b\"`"),
                );
            }
            for member in members {
                check_node(member, span, max_distance, diagnostics);
            }
        }
        SchemaTypeNode::Literal { .. } | SchemaTypeNode::Null | SchemaTypeNode::Reference { .. } => {}
    }
}

/// `T | null`
fn is_nullable(members: &[SchemaTypeNode]) -> bool {
    members.len() == 2 && members.iter().filter(|m| matches!(m, SchemaTypeNode::Null)).count() == 1
}

/// `"a" | "b" | ...`, optionally with a single `null`
fn is_enumeration(members: &[SchemaTypeNode]) -> bool {
    let literals = members
        .iter()
        .filter(|m| matches!(m, SchemaTypeNode::Literal { .. }))
        .count();
    let nulls = members
        .iter()
        .filter(|m| matches!(m, SchemaTypeNode::Null))
        .count();
    literals >= 1 && nulls <= 1 && literals + nulls == members.len()
}

impl Validator for SchemaValidator {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        self.check(ctx.file, ctx.options.max_suggestion_distance)
    }
}
