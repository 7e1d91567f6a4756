//! Common test utilities for compiler integration tests

#![allow(dead_code)]

use pipewright_compiler::{CompileResult, Compiler, FileResolver};
use pipewright_core::ast::*;
use pipewright_core::{DiagnosticCode, Span};
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory project: normalized path to file contents
#[derive(Debug, Default, Clone)]
pub struct MemoryResolver {
    files: BTreeMap<String, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file holding the YAML interchange form of an AST
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    /// Add a file by encoding an AST
    pub fn with_ast(self, file: &SourceFile) -> Self {
        let content = file.to_yaml_string().unwrap();
        let path = file.path.clone();
        self.with_file(&path, &content)
    }
}

impl FileResolver for MemoryResolver {
    fn resolve(&self, path: &str) -> Option<String> {
        self.files.get(path).cloned()
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}

/// Route compiler logs to the test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Compiler reading imports from `resolver`
pub fn compiler_with(resolver: MemoryResolver) -> Compiler {
    init_tracing();
    Compiler::new().with_resolver(Arc::new(resolver))
}

/// `import { names } from "source"` at line 1 of `file`
pub fn import(file: &str, source: &str, names: &[&str]) -> ImportDeclarationNode {
    ImportDeclarationNode::new(
        source,
        names.iter().map(|name| ImportedName::new(*name)).collect(),
    )
    .with_span(Span::line(file, 1))
}

/// A file declaring one type
pub fn type_file(path: &str, name: &str, body: SchemaTypeNode) -> SourceFile {
    SourceFile::new(path).with_type(name, body)
}

/// A string-literal enumeration type body
pub fn enumeration(values: &[&str]) -> SchemaTypeNode {
    SchemaTypeNode::union(values.iter().map(|v| SchemaTypeNode::literal(*v)).collect())
}

/// A one-job workflow with a shell step
pub fn simple_workflow(name: &str) -> WorkflowNode {
    WorkflowNode::new(name).on(&["push"]).with_job(JobNode::plain(
        "build",
        Some("ubuntu-latest"),
        vec![StepNode::shell("make")],
    ))
}

/// Codes of a result's diagnostics, in reporting order
pub fn codes(result: &CompileResult) -> Vec<DiagnosticCode> {
    result.diagnostics.iter().map(|d| d.code()).collect()
}

/// Assert that a result carries `code`, returning the first such diagnostic
pub fn expect_code(result: &CompileResult, code: DiagnosticCode) -> &pipewright_core::Diagnostic {
    result
        .diagnostics
        .iter()
        .find(|d| d.code() == code)
        .unwrap_or_else(|| panic!("expected {} in {:?}", code, codes(result)))
}
