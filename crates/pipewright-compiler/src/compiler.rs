//! Main compiler
//!
//! Sequences the passes for a batch of files:
//! 1. Resolve import paths and load missing files through the resolver
//! 2. Build the import graph and fail every file on an import cycle
//! 3. Register types file by file in merge order
//! 4. Run every validator, then transform and emit
//!
//! Problems in the sources never abort a batch. They are reported as
//! diagnostics on each file's [`CompileResult`].

use crate::codegen::{IrTransform, YamlEmitter};
use crate::error::{CompileError, Result};
use crate::frontend::{FileResolver, Frontend, InterchangeFrontend, NoFiles};
use crate::import::{normalize_path, ImportEdge, ImportGraph, PathResolver};
use crate::options::CompilerOptions;
use crate::semantic::type_registry::{FileSnapshot, TypeRegistry};
use crate::validator::{default_validators, run_all, ValidationContext, Validator};
use pipewright_core::ast::SourceFile;
use pipewright_core::{Diagnostic, DiagnosticCode, Span};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of compiling one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileResult {
    /// Emitted workflow, `None` for files without a workflow or on fatal errors
    pub text: Option<String>,

    /// Every diagnostic found, in reporting order
    pub diagnostics: Vec<Diagnostic>,

    /// No error-severity diagnostic was reported
    pub success: bool,
}

impl CompileResult {
    fn new(text: Option<String>, diagnostics: Vec<Diagnostic>) -> Self {
        let success = !diagnostics.iter().any(Diagnostic::is_error);
        Self {
            text,
            diagnostics,
            success,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// Diagnostics with the given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code() == code)
    }
}

/// A file taking part in a batch
struct Unit {
    source: SourceFile,
    /// Resolved imports, part of the import graph
    edges: Vec<ImportEdge>,
    /// Imports whose path did not resolve; their names are bound opaquely
    unresolved: Vec<ImportEdge>,
    diagnostics: Vec<Diagnostic>,
}

/// An import target that could not be compiled
enum Unavailable {
    Missing,
    Invalid(Diagnostic),
}

/// The pipewright compiler
pub struct Compiler {
    options: CompilerOptions,
    paths: PathResolver,
    registry: TypeRegistry,
    validators: Vec<Box<dyn Validator>>,
    resolver: Arc<dyn FileResolver>,
    frontend: Arc<dyn Frontend>,
}

impl Compiler {
    /// Create a compiler with default options and no file access
    pub fn new() -> Self {
        Self::build(CompilerOptions::default())
    }

    /// Create a compiler with custom options
    pub fn with_options(options: CompilerOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: CompilerOptions) -> Self {
        Self {
            paths: PathResolver::new(options.source_extension.clone()),
            registry: TypeRegistry::new(options.max_suggestion_distance),
            validators: default_validators(),
            resolver: Arc::new(NoFiles),
            frontend: Arc::new(InterchangeFrontend),
            options,
        }
    }

    /// Read imported files through `resolver`
    pub fn with_resolver(mut self, resolver: Arc<dyn FileResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Parse loaded files with `frontend`
    pub fn with_frontend(mut self, frontend: Arc<dyn Frontend>) -> Self {
        self.frontend = frontend;
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile a single file, loading its imports through the resolver
    pub fn compile(&self, file: SourceFile) -> Result<CompileResult> {
        let path = normalize_path(&file.path);
        self.compile_batch(vec![file])?
            .remove(&path)
            .ok_or(CompileError::EntryNotFound { path })
    }

    /// Load `path` through the resolver and compile it with its imports
    pub fn compile_entry(&self, path: &str) -> Result<BTreeMap<String, CompileResult>> {
        let path = normalize_path(path);
        let content = self
            .resolver
            .resolve(&path)
            .ok_or_else(|| CompileError::EntryNotFound { path: path.clone() })?;

        match self.frontend.parse(&path, &content) {
            Ok(file) => self.compile_batch(vec![file]),
            Err(diagnostic) => {
                warn!(file = %path, "entry file failed to parse");
                Ok(BTreeMap::from([(path, CompileResult::new(None, vec![diagnostic]))]))
            }
        }
    }

    /// Compile a batch of files.
    ///
    /// Imports of files outside the batch are loaded through the resolver.
    /// Every file of the batch and every loaded file gets a result.
    pub fn compile_batch(&self, files: Vec<SourceFile>) -> Result<BTreeMap<String, CompileResult>> {
        info!(files = files.len(), "compiling batch");

        let mut units: BTreeMap<String, Unit> = BTreeMap::new();
        for file in files {
            let path = normalize_path(&file.path);
            units.entry(path.clone()).or_insert_with(|| self.unit(&path, file));
        }
        let unavailable = self.load_imports(&mut units);

        let mut graph = ImportGraph::new();
        for (path, unit) in &units {
            graph.add_file(path, unit.edges.clone());
        }

        let cyclic = graph.cyclic_files();
        if !cyclic.is_empty() {
            warn!(files = ?cyclic, "import cycle found");
        }

        let mut results = BTreeMap::new();
        for (path, missing) in &unavailable {
            if let Unavailable::Invalid(diagnostic) = missing {
                results.insert(path.clone(), CompileResult::new(None, vec![diagnostic.clone()]));
            }
        }

        for path in &cyclic {
            let Some(unit) = units.remove(path) else {
                continue;
            };
            let mut diagnostics = unit.diagnostics;
            diagnostics.push(self.cycle_diagnostic(&graph, path, &unit.edges));
            results.insert(path.clone(), CompileResult::new(None, diagnostics));
        }

        let order = graph.acyclic_order();
        debug!(order = ?order, "merge order");

        let mut snapshots: BTreeMap<String, Arc<FileSnapshot>> = BTreeMap::new();
        for path in order {
            let Some(unit) = units.remove(&path) else {
                continue;
            };
            let (snapshot, result) = self.compile_unit(&path, unit, &cyclic, &unavailable, &snapshots)?;
            info!(
                file = %path,
                diagnostics = result.diagnostics.len(),
                success = result.success,
                "compiled file"
            );
            snapshots.insert(path.clone(), snapshot);
            results.insert(path, result);
        }

        Ok(results)
    }

    fn compile_unit(
        &self,
        path: &str,
        unit: Unit,
        cyclic: &BTreeSet<String>,
        unavailable: &BTreeMap<String, Unavailable>,
        snapshots: &BTreeMap<String, Arc<FileSnapshot>>,
    ) -> Result<(Arc<FileSnapshot>, CompileResult)> {
        let mut diagnostics = unit.diagnostics;

        for edge in &unit.edges {
            match unavailable.get(&edge.target) {
                Some(Unavailable::Missing) => diagnostics.push(Diagnostic::error(
                    DiagnosticCode::UNRESOLVED_IMPORT,
                    format!("cannot resolve import '{}': file not found", edge.target),
                    edge.span.clone(),
                )),
                Some(Unavailable::Invalid(_)) => diagnostics.push(Diagnostic::error(
                    DiagnosticCode::DEPENDENCY_UNAVAILABLE,
                    format!("imported file '{}' could not be parsed", edge.target),
                    edge.span.clone(),
                )),
                None if cyclic.contains(&edge.target) => diagnostics.push(Diagnostic::error(
                    DiagnosticCode::DEPENDENCY_UNAVAILABLE,
                    format!("imported file '{}' is part of an import cycle", edge.target),
                    edge.span.clone(),
                )),
                None => {}
            }
        }

        let mut edges = unit.edges;
        edges.extend(unit.unresolved);
        let (snapshot, type_diagnostics) =
            self.registry
                .register(path, &unit.source.types, &edges, snapshots);
        diagnostics.extend(type_diagnostics);

        let ctx = ValidationContext::new(&unit.source, &snapshot, &self.options);
        diagnostics.extend(run_all(&self.validators, &ctx));

        let text = match &unit.source.workflow {
            Some(workflow) => {
                let ir = IrTransform::new(&self.options, &snapshot).transform(workflow);
                Some(YamlEmitter.emit(&ir)?)
            }
            None => None,
        };

        Ok((snapshot, CompileResult::new(text, diagnostics)))
    }

    /// Resolve the import paths of a file
    fn unit(&self, path: &str, source: SourceFile) -> Unit {
        let mut edges = Vec::new();
        let mut unresolved = Vec::new();
        let mut diagnostics = Vec::new();

        for import in &source.imports {
            match self.paths.resolve(&import.source, path, &import.span) {
                Ok(resolved) => {
                    diagnostics.extend(resolved.warnings);
                    edges.push(
                        ImportEdge::new(resolved.path, import.names.clone())
                            .with_span(import.span.clone()),
                    );
                }
                Err(rejected) => {
                    diagnostics.extend(rejected.into_diagnostics());
                    unresolved.push(
                        ImportEdge::new(import.source.clone(), import.names.clone())
                            .with_span(import.span.clone()),
                    );
                }
            }
        }

        Unit {
            source,
            edges,
            unresolved,
            diagnostics,
        }
    }

    /// Load import targets missing from the batch until none are left
    fn load_imports(&self, units: &mut BTreeMap<String, Unit>) -> BTreeMap<String, Unavailable> {
        let mut unavailable = BTreeMap::new();
        loop {
            let pending: BTreeSet<String> = units
                .values()
                .flat_map(|unit| unit.edges.iter().map(|edge| edge.target.clone()))
                .filter(|target| !units.contains_key(target) && !unavailable.contains_key(target))
                .collect();
            if pending.is_empty() {
                return unavailable;
            }

            for target in pending {
                let Some(content) = self.resolver.resolve(&target) else {
                    debug!(file = %target, "import target not found");
                    unavailable.insert(target, Unavailable::Missing);
                    continue;
                };
                match self.frontend.parse(&target, &content) {
                    Ok(source) => {
                        debug!(file = %target, "loaded import target");
                        let unit = self.unit(&target, source);
                        units.insert(target, unit);
                    }
                    Err(diagnostic) => {
                        warn!(file = %target, "import target failed to parse");
                        unavailable.insert(target, Unavailable::Invalid(diagnostic));
                    }
                }
            }
        }
    }

    fn cycle_diagnostic(&self, graph: &ImportGraph, path: &str, edges: &[ImportEdge]) -> Diagnostic {
        let cycle = graph.cycle_through(path).unwrap_or_else(|| vec![path.to_string()]);
        let span = cycle
            .get(1)
            .and_then(|next| edges.iter().find(|edge| &edge.target == next))
            .map(|edge| edge.span.clone())
            .unwrap_or_else(|| Span::file(path));

        Diagnostic::error(
            DiagnosticCode::CIRCULAR_IMPORT,
            format!("circular import: {}", cycle.join(" -> ")),
            span,
        )
        .with_hint("files in an import cycle have no valid merge order; break the cycle")
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
