//! Workflow and source-file AST definitions

use crate::ast::expression::Expression;
use crate::ast::import::ImportDeclarationNode;
use crate::ast::job::{JobKind, JobNode};
use crate::ast::schema::{SchemaTypeNode, TypeDeclarationNode};
use crate::ast::step::StepNode;
use crate::error::Result;
use crate::span::Span;
use serde::{Deserialize, Serialize};

/// One parsed source file
///
/// A file may hold only type declarations, in which case `workflow` is
/// `None` and no output text is generated for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Project-relative path of the file
    #[serde(default)]
    pub path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<ImportDeclarationNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDeclarationNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowNode>,
}

/// A workflow declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub name: String,

    #[serde(default)]
    pub span: Span,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerNode>,

    #[serde(default)]
    pub jobs: Vec<JobNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cycles: Vec<CycleNode>,
}

/// Events that start the workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerNode {
    pub events: Vec<String>,

    #[serde(default)]
    pub span: Span,
}

/// A bounded (or not) repetition of a job-like block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleNode {
    pub name: String,

    #[serde(default)]
    pub span: Span,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,

    /// Stop predicate; the cycle ends once it holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<Expression>,

    /// Iteration ceiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,

    pub steps: Vec<StepNode>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            imports: Vec::new(),
            types: Vec::new(),
            workflow: None,
        }
    }

    pub fn with_import(mut self, import: ImportDeclarationNode) -> Self {
        self.imports.push(import);
        self
    }

    pub fn with_type(mut self, name: impl Into<String>, body: SchemaTypeNode) -> Self {
        self.types.push(TypeDeclarationNode::new(name, body));
        self
    }

    pub fn with_workflow(mut self, workflow: WorkflowNode) -> Self {
        self.workflow = Some(workflow);
        self
    }

    /// Decode the YAML interchange form of an AST.
    ///
    /// `path` overrides any path stored in the document, and spans without
    /// a file are attributed to it.
    pub fn from_yaml_str(path: &str, text: &str) -> Result<Self> {
        let mut file: SourceFile = serde_yaml::from_str(text)?;
        file.attach_path(path);
        Ok(file)
    }

    /// Decode the JSON interchange form of an AST
    pub fn from_json_str(path: &str, text: &str) -> Result<Self> {
        let mut file: SourceFile = serde_json::from_str(text)?;
        file.attach_path(path);
        Ok(file)
    }

    /// Encode to the YAML interchange form
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn attach_path(&mut self, path: &str) {
        self.path = path.to_string();
        let stamp = |span: &mut Span| {
            if span.file.is_empty() {
                span.file = path.to_string();
            }
        };
        stamp_all(self, &stamp);
    }
}

fn stamp_all(file: &mut SourceFile, stamp: &dyn Fn(&mut Span)) {
    for import in &mut file.imports {
        stamp(&mut import.span);
        for name in &mut import.names {
            stamp(&mut name.span);
        }
    }
    for decl in &mut file.types {
        stamp(&mut decl.span);
        stamp_schema(&mut decl.body, stamp);
    }
    if let Some(workflow) = &mut file.workflow {
        stamp(&mut workflow.span);
        if let Some(trigger) = &mut workflow.trigger {
            stamp(&mut trigger.span);
        }
        for job in &mut workflow.jobs {
            stamp(&mut job.span);
            for output in &mut job.outputs {
                stamp(&mut output.span);
                stamp_schema(&mut output.ty, stamp);
            }
            match &mut job.kind {
                JobKind::Plain { steps } | JobKind::Matrix { steps, .. } => {
                    stamp_steps(steps, stamp)
                }
                JobKind::Agent { task } => {
                    if let Some(output) = &mut task.output {
                        stamp_schema(output, stamp);
                    }
                }
            }
        }
        for cycle in &mut workflow.cycles {
            stamp(&mut cycle.span);
            stamp_steps(&mut cycle.steps, stamp);
        }
    }
}

fn stamp_steps(steps: &mut [StepNode], stamp: &dyn Fn(&mut Span)) {
    for step in steps {
        match step {
            StepNode::Shell(s) => stamp(&mut s.span),
            StepNode::Uses(s) => stamp(&mut s.span),
            StepNode::AgentTask(s) => {
                stamp(&mut s.span);
                if let Some(output) = &mut s.task.output {
                    stamp_schema(output, stamp);
                }
            }
            StepNode::Guard(s) => {
                stamp(&mut s.span);
                stamp_steps(&mut s.steps, stamp);
            }
        }
    }
}

fn stamp_schema(node: &mut SchemaTypeNode, stamp: &dyn Fn(&mut Span)) {
    match node {
        SchemaTypeNode::Object { fields } => {
            for field in fields {
                stamp(&mut field.span);
                stamp_schema(&mut field.ty, stamp);
            }
        }
        SchemaTypeNode::Array { item } => stamp_schema(item, stamp),
        SchemaTypeNode::Union { members } => {
            for member in members {
                stamp_schema(member, stamp);
            }
        }
        SchemaTypeNode::Primitive { .. }
        | SchemaTypeNode::Literal { .. }
        | SchemaTypeNode::Null
        | SchemaTypeNode::Reference { .. } => {}
    }
}

impl WorkflowNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
            trigger: None,
            jobs: Vec::new(),
            cycles: Vec::new(),
        }
    }

    pub fn on(mut self, events: &[&str]) -> Self {
        self.trigger = Some(TriggerNode {
            events: events.iter().map(|e| e.to_string()).collect(),
            span: Span::default(),
        });
        self
    }

    pub fn with_job(mut self, job: JobNode) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn with_cycle(mut self, cycle: CycleNode) -> Self {
        self.cycles.push(cycle);
        self
    }

    pub fn job(&self, name: &str) -> Option<&JobNode> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

impl CycleNode {
    pub fn new(name: impl Into<String>, target: Option<&str>, steps: Vec<StepNode>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
            target: target.map(str::to_string),
            needs: Vec::new(),
            until: None,
            max_iterations: None,
            steps,
        }
    }

    pub fn until(mut self, predicate: Expression) -> Self {
        self.until = Some(predicate);
        self
    }

    pub fn max_iterations(mut self, ceiling: u32) -> Self {
        self.max_iterations = Some(ceiling);
        self
    }

    pub fn with_needs(mut self, needs: &[&str]) -> Self {
        self.needs = needs.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}
