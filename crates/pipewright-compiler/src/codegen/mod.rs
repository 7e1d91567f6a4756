//! Code generation module
//!
//! Lowers a validated workflow to IR and writes the IR as YAML.

pub mod condition;
pub mod emitter;
pub mod json_schema;
pub mod shell;
pub mod transform;

pub use condition::ConditionCompiler;
pub use emitter::YamlEmitter;
pub use json_schema::to_json_schema;
pub use shell::normalize_script;
pub use transform::IrTransform;
