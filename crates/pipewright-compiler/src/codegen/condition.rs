//! Condition compiler
//!
//! Compiles condition expressions into the target's expression syntax. The
//! result is a bare expression: condition fields are evaluated by the target
//! without interpolation delimiters, so none are added.

use pipewright_core::ast::{Expression, UnaryOperator};
use pipewright_core::Scalar;

/// Condition compiler
pub struct ConditionCompiler;

impl ConditionCompiler {
    /// Compile an expression to a target-native condition string
    pub fn compile(expr: &Expression) -> String {
        let mut out = String::new();
        Self::write(expr, &mut out);
        out
    }

    /// Quote a string literal: `'it''s'`
    pub fn quote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn write(expr: &Expression, out: &mut String) {
        match expr {
            Expression::Literal { value } => match value {
                Scalar::String(s) => out.push_str(&Self::quote(s)),
                other => out.push_str(&other.to_string()),
            },
            Expression::Null => out.push_str("null"),
            Expression::Path { segments } => out.push_str(&segments.join(".")),
            Expression::Binary { left, op, right } => {
                let precedence = op.precedence();
                Self::write_operand(left, out, |p| p < precedence);
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                // Operators are left-associative
                Self::write_operand(right, out, |p| p <= precedence);
            }
            Expression::Unary { op, operand } => {
                out.push_str(op.symbol());
                let needs_parens = match operand.as_ref() {
                    Expression::Binary { .. } => true,
                    Expression::Unary { op: inner, .. } => {
                        *op == UnaryOperator::Negate && *inner == UnaryOperator::Negate
                    }
                    _ => false,
                };
                if needs_parens {
                    out.push('(');
                    Self::write(operand, out);
                    out.push(')');
                } else {
                    Self::write(operand, out);
                }
            }
            Expression::Call { name, args } => {
                out.push_str(name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    Self::write(arg, out);
                }
                out.push(')');
            }
        }
    }

    fn write_operand(expr: &Expression, out: &mut String, wrap: impl Fn(u8) -> bool) {
        match expr {
            Expression::Binary { op, .. } if wrap(op.precedence()) => {
                out.push('(');
                Self::write(expr, out);
                out.push(')');
            }
            _ => Self::write(expr, out),
        }
    }
}
