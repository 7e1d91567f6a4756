//! File-level import graph

use crate::graph::Digraph;
use crate::import::path_resolver::normalize_path;
use pipewright_core::ast::ImportedName;
use pipewright_core::Span;
use std::collections::{BTreeMap, BTreeSet};

/// One import relation: the importing file pulls `names` from `target`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportEdge {
    pub target: String,
    pub names: Vec<ImportedName>,
    pub span: Span,
}

impl ImportEdge {
    pub fn new(target: impl Into<String>, names: Vec<ImportedName>) -> Self {
        Self {
            target: target.into(),
            names,
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Directed graph over normalized file paths.
///
/// An edge `a -> b` means file `a` imports names from file `b`. Every path
/// handed in is normalized first, so equivalent spellings share one node.
#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    graph: Digraph<String>,
    edges: BTreeMap<String, Vec<ImportEdge>>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and its import edges
    pub fn add_file(&mut self, path: &str, edges: Vec<ImportEdge>) {
        let path = normalize_path(path);
        self.graph.add_node(path.clone());
        let list = self.edges.entry(path.clone()).or_default();
        for mut edge in edges {
            edge.target = normalize_path(&edge.target);
            self.graph.add_edge(path.clone(), edge.target.clone());
            list.push(edge);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.graph.contains(&normalize_path(path))
    }

    /// Every known file, including import targets never registered themselves
    pub fn files(&self) -> impl Iterator<Item = &String> {
        self.graph.nodes()
    }

    /// Import edges declared by a file, in source order
    pub fn edges(&self, path: &str) -> &[ImportEdge] {
        self.edges
            .get(&normalize_path(path))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Direct dependencies of a file, in path order
    pub fn dependencies(&self, path: &str) -> Vec<&String> {
        self.graph.successors(&normalize_path(path)).collect()
    }

    pub fn has_cycle(&self) -> bool {
        self.graph.has_cycle()
    }

    /// First import cycle, as the file list from its start back to itself
    pub fn get_cycle(&self) -> Option<Vec<String>> {
        self.graph.find_cycle()
    }

    /// Every file that takes part in some import cycle
    pub fn cyclic_files(&self) -> BTreeSet<String> {
        self.graph.cyclic_nodes()
    }

    /// Shortest cycle through `path`, if it is on one
    pub fn cycle_through(&self, path: &str) -> Option<Vec<String>> {
        self.graph.cycle_through(&normalize_path(path))
    }

    /// Merge order: every file after all of its imports, ties by path.
    ///
    /// Returns the blocking cycle when the graph is cyclic.
    pub fn get_topological_order(&self) -> Result<Vec<String>, Vec<String>> {
        self.graph.topological_order()
    }

    /// Merge order of the files outside every cycle
    pub fn acyclic_order(&self) -> Vec<String> {
        let cyclic = self.cyclic_files();
        self.graph
            .subgraph(|path| !cyclic.contains(path))
            .topological_order()
            .unwrap_or_default()
    }
}
