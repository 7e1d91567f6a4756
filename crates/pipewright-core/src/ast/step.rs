//! Step AST definitions
//!
//! Steps keep their source order; the order is semantically significant.

use crate::ast::job::AgentTask;
use crate::span::Span;
use crate::value::Scalar;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A step inside a job or cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepNode {
    /// Shell script, kept verbatim
    Shell(ShellStep),
    /// Action reference with parameters
    Uses(UsesStep),
    /// Inline agent task
    AgentTask(AgentTaskStep),
    /// Raw condition applied to a block of nested steps
    Guard(GuardStep),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Script content as written, including indentation
    pub run: String,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsesStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Action reference, e.g. `actions/checkout@v4`
    pub action: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub with: IndexMap<String, Scalar>,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTaskStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub task: AgentTask,

    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardStep {
    /// Target-native condition, passed through unchecked
    pub condition: String,

    pub steps: Vec<StepNode>,

    #[serde(default)]
    pub span: Span,
}

impl StepNode {
    /// Create a shell step
    pub fn shell(run: impl Into<String>) -> Self {
        StepNode::Shell(ShellStep {
            name: None,
            run: run.into(),
            span: Span::default(),
        })
    }

    /// Create a uses step without parameters
    pub fn uses(action: impl Into<String>) -> Self {
        StepNode::Uses(UsesStep {
            name: None,
            action: action.into(),
            with: IndexMap::new(),
            span: Span::default(),
        })
    }

    /// Create an agent-task step
    pub fn agent_task(task: AgentTask) -> Self {
        StepNode::AgentTask(AgentTaskStep {
            name: None,
            task,
            span: Span::default(),
        })
    }

    /// Create a guard block
    pub fn guard(condition: impl Into<String>, steps: Vec<StepNode>) -> Self {
        StepNode::Guard(GuardStep {
            condition: condition.into(),
            steps,
            span: Span::default(),
        })
    }

    pub fn span(&self) -> &Span {
        match self {
            StepNode::Shell(s) => &s.span,
            StepNode::Uses(s) => &s.span,
            StepNode::AgentTask(s) => &s.span,
            StepNode::Guard(s) => &s.span,
        }
    }

    /// Attach a span
    pub fn with_span(mut self, span: Span) -> Self {
        match &mut self {
            StepNode::Shell(s) => s.span = span,
            StepNode::Uses(s) => s.span = span,
            StepNode::AgentTask(s) => s.span = span,
            StepNode::Guard(s) => s.span = span,
        }
        self
    }

    /// Attach a display name (guards have none)
    pub fn named(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            StepNode::Shell(s) => s.name = Some(name.into()),
            StepNode::Uses(s) => s.name = Some(name.into()),
            StepNode::AgentTask(s) => s.name = Some(name.into()),
            StepNode::Guard(_) => {}
        }
        self
    }

    /// Add a `with:` parameter to a uses step
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        if let StepNode::Uses(s) = &mut self {
            s.with.insert(key.into(), value.into());
        }
        self
    }
}
