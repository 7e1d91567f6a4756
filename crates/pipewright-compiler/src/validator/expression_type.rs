//! Best-effort type checks of condition expressions
//!
//! Conditions are interpolated dynamically at runtime, so nothing here is
//! ever an error: an incompatible comparison is a warning and arithmetic on
//! a non-numeric value is informational. Anything whose type cannot be
//! determined statically is accepted silently.

use crate::semantic::type_checker::{lookup_path, PathLookup};
use crate::semantic::type_registry::{FileSnapshot, ResolvedType};
use crate::validator::{ValidationContext, Validator};
use pipewright_core::ast::{Expression, Primitive, UnaryOperator, WorkflowNode};
use pipewright_core::{Diagnostic, DiagnosticCode, Scalar, Span};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionTypeValidator;

/// A literal operand of a comparison
enum LiteralOperand<'a> {
    Scalar(&'a Scalar),
    Null,
}

impl LiteralOperand<'_> {
    fn describe(&self) -> String {
        match self {
            LiteralOperand::Scalar(Scalar::String(s)) => format!("'{}'", s),
            LiteralOperand::Scalar(other) => format!("{} {}", other.kind_name(), other),
            LiteralOperand::Null => "null".to_string(),
        }
    }
}

struct Checker<'a> {
    workflow: &'a WorkflowNode,
    types: &'a FileSnapshot,
    max_distance: usize,
    span: &'a Span,
    diagnostics: Vec<Diagnostic>,
}

impl ExpressionTypeValidator {
    pub fn check(
        &self,
        workflow: &WorkflowNode,
        types: &FileSnapshot,
        max_distance: usize,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let conditions = workflow
            .jobs
            .iter()
            .filter_map(|j| j.condition.as_ref().map(|c| (c, &j.span)))
            .chain(
                workflow
                    .cycles
                    .iter()
                    .filter_map(|c| c.until.as_ref().map(|u| (u, &c.span))),
            );

        for (expr, span) in conditions {
            let mut checker = Checker {
                workflow,
                types,
                max_distance,
                span,
                diagnostics: Vec::new(),
            };
            checker.visit(expr);
            diagnostics.append(&mut checker.diagnostics);
        }
        diagnostics
    }
}

impl Checker<'_> {
    fn visit(&mut self, expr: &Expression) {
        match expr {
            Expression::Binary { left, op, right } => {
                if op.is_comparison() {
                    self.check_comparison(left, right, op.symbol());
                    self.check_comparison(right, left, op.symbol());
                } else if op.is_arithmetic() {
                    self.check_arithmetic(left, op.symbol());
                    self.check_arithmetic(right, op.symbol());
                }
                self.visit(left);
                self.visit(right);
            }
            Expression::Unary { op, operand } => {
                if *op == UnaryOperator::Negate {
                    self.check_arithmetic(operand, op.symbol());
                }
                self.visit(operand);
            }
            Expression::Call { args, .. } => {
                for arg in args {
                    self.visit(arg);
                }
            }
            Expression::Literal { .. } | Expression::Null | Expression::Path { .. } => {}
        }
    }

    /// Declared type of a path operand, with names and `T | null` peeled off
    fn declared_type(&self, expr: &Expression) -> Option<(String, ResolvedType)> {
        let Expression::Path { segments } = expr else {
            return None;
        };
        match lookup_path(self.workflow, self.types, segments, self.max_distance) {
            PathLookup::Typed(ty) => Some((segments.join("."), ty)),
            _ => None,
        }
    }

    fn check_comparison(&mut self, path: &Expression, other: &Expression, symbol: &str) {
        let literal = match other {
            Expression::Literal { value } => LiteralOperand::Scalar(value),
            Expression::Null => LiteralOperand::Null,
            _ => return,
        };
        let Some((name, declared)) = self.declared_type(path) else {
            return;
        };
        if compatible(self.types, &declared, &literal) {
            return;
        }
        self.diagnostics.push(Diagnostic::warning(
            DiagnosticCode::INCOMPATIBLE_COMPARISON,
            format!(
                "'{}' has type {} and is compared ({}) with {}",
                name,
                declared,
                symbol,
                literal.describe()
            ),
            self.span.clone(),
        ));
    }

    fn check_arithmetic(&mut self, operand: &Expression, symbol: &str) {
        let Some((name, declared)) = self.declared_type(operand) else {
            return;
        };
        if is_numeric(self.types, &declared) {
            return;
        }
        self.diagnostics.push(Diagnostic::info(
            DiagnosticCode::NON_NUMERIC_ARITHMETIC,
            format!(
                "operator '{}' applied to '{}', which has non-numeric type {}",
                symbol, name, declared
            ),
            self.span.clone(),
        ));
    }
}

fn compatible(types: &FileSnapshot, declared: &ResolvedType, literal: &LiteralOperand<'_>) -> bool {
    match types.expand(declared) {
        ResolvedType::Unknown | ResolvedType::Primitive(Primitive::Json) => true,
        ResolvedType::Null => matches!(literal, LiteralOperand::Null),
        ResolvedType::Union(members) => members.iter().any(|m| compatible(types, m, literal)),
        ResolvedType::Primitive(primitive) => match literal {
            LiteralOperand::Null => false,
            LiteralOperand::Scalar(value) => match primitive {
                Primitive::String | Primitive::Path => matches!(value, Scalar::String(_)),
                Primitive::Int | Primitive::Float => value.is_numeric(),
                Primitive::Bool => matches!(value, Scalar::Bool(_)),
                Primitive::Json => true,
            },
        },
        ResolvedType::Literal(expected) => match literal {
            LiteralOperand::Scalar(Scalar::String(s)) => s == expected,
            _ => false,
        },
        ResolvedType::Object(_) | ResolvedType::Array(_) => false,
        ResolvedType::Named(_) => true,
    }
}

fn is_numeric(types: &FileSnapshot, declared: &ResolvedType) -> bool {
    match types.expand(declared) {
        ResolvedType::Primitive(p) => p.is_numeric() || *p == Primitive::Json,
        ResolvedType::Union(members) => match ResolvedType::non_null_member(members) {
            Some(inner) => is_numeric(types, inner),
            None => true,
        },
        ResolvedType::Unknown | ResolvedType::Named(_) => true,
        ResolvedType::Object(_)
        | ResolvedType::Array(_)
        | ResolvedType::Literal(_)
        | ResolvedType::Null => false,
    }
}

impl Validator for ExpressionTypeValidator {
    fn name(&self) -> &'static str {
        "expression-type"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        match &ctx.file.workflow {
            Some(workflow) => {
                self.check(workflow, ctx.types, ctx.options.max_suggestion_distance)
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::type_registry::TypeRegistry;
    use pipewright_core::ast::{BinaryOperator, JobNode, SchemaTypeNode, StepNode, TypeDeclarationNode};
    use pipewright_core::Severity;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn types() -> Arc<FileSnapshot> {
        let decls = vec![TypeDeclarationNode::new(
            "Report",
            SchemaTypeNode::object([
                (
                    "status",
                    SchemaTypeNode::union(vec![
                        SchemaTypeNode::literal("ok"),
                        SchemaTypeNode::literal("failed"),
                    ]),
                ),
                ("score", SchemaTypeNode::primitive("int")),
                ("summary", SchemaTypeNode::primitive("string")),
            ]),
        )];
        TypeRegistry::new(2).register("a.flow", &decls, &[], &BTreeMap::new()).0
    }

    fn check(condition: Expression) -> Vec<Diagnostic> {
        let wf = WorkflowNode::new("CI")
            .with_job(
                JobNode::plain("review", Some("ubuntu-latest"), vec![StepNode::shell("make")])
                    .with_output("report", SchemaTypeNode::reference("Report")),
            )
            .with_job(
                JobNode::plain("ship", Some("ubuntu-latest"), vec![StepNode::shell("ship")])
                    .with_needs(&["review"])
                    .with_condition(condition),
            );
        ExpressionTypeValidator.check(&wf, &types(), 2)
    }

    fn compare(path: &str, op: BinaryOperator, literal: impl Into<Scalar>) -> Expression {
        Expression::binary(Expression::path(path), op, Expression::literal(literal))
    }

    #[test]
    fn test_compatible_comparisons_pass() {
        assert!(check(compare("needs.review.outputs.report.score", BinaryOperator::Ge, 80)).is_empty());
        assert!(check(compare("needs.review.outputs.report.status", BinaryOperator::Eq, "ok")).is_empty());
    }

    #[test]
    fn test_int_compared_with_string_warns() {
        let diags = check(compare("needs.review.outputs.report.score", BinaryOperator::Eq, "high"));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code(), DiagnosticCode::INCOMPATIBLE_COMPARISON);
        assert_eq!(diags[0].severity(), Severity::Warning);
    }

    #[test]
    fn test_value_outside_enumeration_warns() {
        let diags = check(compare("needs.review.outputs.report.status", BinaryOperator::Eq, "passed"));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_literal_on_the_left_is_checked() {
        let expr = Expression::binary(
            Expression::literal(true),
            BinaryOperator::Ne,
            Expression::path("needs.review.outputs.report.summary"),
        );
        assert_eq!(check(expr).len(), 1);
    }

    #[test]
    fn test_arithmetic_on_string_is_informational() {
        let expr = Expression::binary(
            Expression::binary(
                Expression::path("needs.review.outputs.report.summary"),
                BinaryOperator::Add,
                Expression::literal(1i64),
            ),
            BinaryOperator::Gt,
            Expression::literal(2i64),
        );
        let diags = check(expr);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code(), DiagnosticCode::NON_NUMERIC_ARITHMETIC);
        assert_eq!(diags[0].severity(), Severity::Info);
    }

    #[test]
    fn test_never_reports_errors() {
        let exprs = vec![
            compare("needs.review.outputs.report", BinaryOperator::Eq, "x"),
            compare("github.ref", BinaryOperator::Lt, 3),
            Expression::unary(UnaryOperator::Negate, Expression::path("needs.review.outputs.report.status")),
            Expression::call("contains", vec![Expression::path("needs.review.outputs.report.summary"), Expression::literal("x")]),
        ];
        for expr in exprs {
            assert!(check(expr).iter().all(|d| !d.is_error()));
        }
    }
}
