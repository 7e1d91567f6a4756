//! Cross-file imports: path resolution and the file dependency graph

pub mod import_graph;
pub mod path_resolver;

pub use import_graph::{ImportEdge, ImportGraph};
pub use path_resolver::{normalize_path, PathResolver, RejectedImport, ResolvedImport};
