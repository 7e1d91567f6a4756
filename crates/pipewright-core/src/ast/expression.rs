//! Expression AST nodes

use crate::value::Scalar;
use serde::{Deserialize, Serialize};

/// Expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    /// Literal value
    Literal { value: Scalar },

    /// The `null` literal
    Null,

    /// Property path (e.g., github.ref, needs.build.outputs.report.status)
    Path { segments: Vec<String> },

    /// Binary operation
    Binary {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// Unary operation
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Function call (e.g., contains(github.ref, 'release'))
    Call { name: String, args: Vec<Expression> },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    /// Equal (==)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
    /// Logical AND (&&)
    And,
    /// Logical OR (||)
    Or,
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// Modulo (%)
    Mod,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    /// Logical NOT (!)
    Not,
    /// Arithmetic negation (-)
    Negate,
}

impl BinaryOperator {
    /// Infix symbol in the target expression language
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
        }
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Eq | BinaryOperator::Ne => 3,
            BinaryOperator::Lt | BinaryOperator::Le | BinaryOperator::Gt | BinaryOperator::Ge => 4,
            BinaryOperator::Add | BinaryOperator::Sub => 5,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => 6,
        }
    }

    /// Returns true for == and !=
    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOperator::Eq | BinaryOperator::Ne)
    }

    /// Returns true for <, <=, > and >=
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Lt | BinaryOperator::Le | BinaryOperator::Gt | BinaryOperator::Ge
        )
    }

    /// Returns true if this is a comparison operator
    pub fn is_comparison(&self) -> bool {
        self.is_equality() || self.is_ordering()
    }

    /// Returns true if this is an arithmetic operator
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Sub
                | BinaryOperator::Mul
                | BinaryOperator::Div
                | BinaryOperator::Mod
        )
    }

    /// Returns true if this is a logical operator
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Negate => "-",
        }
    }
}

impl Expression {
    /// Create a literal expression
    pub fn literal(value: impl Into<Scalar>) -> Self {
        Expression::Literal {
            value: value.into(),
        }
    }

    /// Create a property path expression from a dotted string
    pub fn path(dotted: &str) -> Self {
        Expression::Path {
            segments: dotted.split('.').map(str::to_string).collect(),
        }
    }

    /// Create a binary expression
    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Create a unary expression
    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a function call expression
    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Call {
            name: name.into(),
            args,
        }
    }

    /// Visit every property path in this expression, left to right
    pub fn for_each_path<'a>(&'a self, f: &mut dyn FnMut(&'a [String])) {
        match self {
            Expression::Path { segments } => f(segments),
            Expression::Binary { left, right, .. } => {
                left.for_each_path(f);
                right.for_each_path(f);
            }
            Expression::Unary { operand, .. } => operand.for_each_path(f),
            Expression::Call { args, .. } => {
                for arg in args {
                    arg.for_each_path(f);
                }
            }
            Expression::Literal { .. } | Expression::Null => {}
        }
    }
}
