//! Abstract Syntax Tree (AST) definitions for pipewright
//!
//! The AST is produced once per source file by the front end and is never
//! mutated by the compiler. It contains:
//! - Workflows, jobs, cycles and steps
//! - Structural type declarations
//! - Import declarations
//! - Expressions
//!
//! Every node derives serde with an explicit `kind` discriminant on tagged
//! unions, so ASTs can be exchanged as YAML or JSON.

pub mod expression;
pub mod import;
pub mod job;
pub mod schema;
pub mod step;
pub mod workflow;

pub use expression::{BinaryOperator, Expression, UnaryOperator};
pub use import::{ImportDeclarationNode, ImportedName};
pub use job::{AgentTask, JobKind, JobNode, MatrixCombination, MatrixSpec, OutputDecl};
pub use schema::{FieldNode, Primitive, SchemaTypeNode, TypeDeclarationNode};
pub use step::{AgentTaskStep, GuardStep, ShellStep, StepNode, UsesStep};
pub use workflow::{CycleNode, SourceFile, TriggerNode, WorkflowNode};
