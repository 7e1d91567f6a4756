//! Job AST definitions
//!
//! A job is a tagged union over three variants:
//! - `plain`: a target, dependencies, an optional condition and steps
//! - `matrix`: a plain job fanned out over a Cartesian product of axes
//! - `agent`: a job delegating to an agent task with a typed output
//!
//! Fields shared by every variant live on [`JobNode`]; the variant data
//! lives in [`JobKind`].

use crate::ast::expression::Expression;
use crate::ast::schema::SchemaTypeNode;
use crate::ast::step::StepNode;
use crate::span::Span;
use crate::value::Scalar;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A job declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobNode {
    /// Job name, unique within a workflow
    pub name: String,

    #[serde(default)]
    pub span: Span,

    /// Execution target (runner label). Required; checked by validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Names of jobs (or cycles) this job waits for
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,

    /// Run condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expression>,

    /// Typed outputs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputDecl>,

    #[serde(flatten)]
    pub kind: JobKind,
}

/// Variant-specific job data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    Plain {
        steps: Vec<StepNode>,
    },
    Matrix {
        steps: Vec<StepNode>,
        matrix: MatrixSpec,
    },
    Agent {
        task: AgentTask,
    },
}

/// A typed job output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDecl {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: SchemaTypeNode,

    #[serde(default)]
    pub span: Span,
}

/// Matrix strategy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatrixSpec {
    /// Axis name to ordered values
    pub axes: IndexMap<String, Vec<Scalar>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<MatrixCombination>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<MatrixCombination>,
}

/// A point of a matrix, or an include/exclude entry naming such a point
pub type MatrixCombination = IndexMap<String, Scalar>;

/// Agent task specification
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentTask {
    /// Prompt handed to the agent. Required; checked by validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Schema of the agent's structured output. Required; checked by validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<SchemaTypeNode>,
}

impl JobNode {
    /// Create a plain job
    pub fn plain(name: impl Into<String>, target: Option<&str>, steps: Vec<StepNode>) -> Self {
        Self::with_kind(name, target, JobKind::Plain { steps })
    }

    /// Create a matrix job
    pub fn matrix(
        name: impl Into<String>,
        target: Option<&str>,
        matrix: MatrixSpec,
        steps: Vec<StepNode>,
    ) -> Self {
        Self::with_kind(name, target, JobKind::Matrix { steps, matrix })
    }

    /// Create an agent job
    pub fn agent(name: impl Into<String>, target: Option<&str>, task: AgentTask) -> Self {
        Self::with_kind(name, target, JobKind::Agent { task })
    }

    fn with_kind(name: impl Into<String>, target: Option<&str>, kind: JobKind) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
            target: target.map(str::to_string),
            needs: Vec::new(),
            condition: None,
            outputs: Vec::new(),
            kind,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_needs(mut self, needs: &[&str]) -> Self {
        self.needs = needs.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_condition(mut self, condition: Expression) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, ty: SchemaTypeNode) -> Self {
        self.outputs.push(OutputDecl {
            name: name.into(),
            ty,
            span: Span::default(),
        });
        self
    }

    /// Steps of plain and matrix jobs; agent jobs have none
    pub fn steps(&self) -> &[StepNode] {
        match &self.kind {
            JobKind::Plain { steps } | JobKind::Matrix { steps, .. } => steps,
            JobKind::Agent { .. } => &[],
        }
    }

    pub fn matrix_spec(&self) -> Option<&MatrixSpec> {
        match &self.kind {
            JobKind::Matrix { matrix, .. } => Some(matrix),
            JobKind::Plain { .. } | JobKind::Agent { .. } => None,
        }
    }

    /// Variant name, used in messages
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            JobKind::Plain { .. } => "job",
            JobKind::Matrix { .. } => "matrix job",
            JobKind::Agent { .. } => "agent job",
        }
    }
}

impl MatrixSpec {
    /// Matrix with the given axes and no include/exclude entries
    pub fn from_axes<I, K>(axes: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<Scalar>)>,
        K: Into<String>,
    {
        Self {
            axes: axes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ..Self::default()
        }
    }
}

impl AgentTask {
    pub fn new(prompt: impl Into<String>, output: SchemaTypeNode) -> Self {
        Self {
            prompt: Some(prompt.into()),
            output: Some(output),
        }
    }
}
