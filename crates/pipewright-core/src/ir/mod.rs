//! Intermediate Representation (IR) definitions for pipewright
//!
//! The IR is output-format shaped. It is built fresh for every workflow
//! compile, serialized by the emitter and then discarded.

pub mod workflow;

pub use workflow::{AgentParams, JobIR, MatrixIR, StepAction, StepIR, StrategyIR, WorkflowIR};
