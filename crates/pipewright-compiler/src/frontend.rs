//! Host-provided collaborators
//!
//! The compiler never touches the file system or parses source text itself.
//! A [`FileResolver`] supplies file contents and a [`Frontend`] turns them
//! into ASTs.

use pipewright_core::ast::SourceFile;
use pipewright_core::{Diagnostic, DiagnosticCode, Span};

/// Reads project files by normalized project-relative path
pub trait FileResolver: Send + Sync {
    /// File contents, or `None` when the file does not exist
    fn resolve(&self, path: &str) -> Option<String>;

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }
}

/// Parses one file's contents into an AST
pub trait Frontend: Send + Sync {
    fn parse(&self, path: &str, content: &str) -> Result<SourceFile, Diagnostic>;
}

/// Front end over the AST interchange form (YAML, which also reads JSON).
///
/// Any document that does not have the node shape the compiler expects is
/// rejected with a structural diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterchangeFrontend;

impl Frontend for InterchangeFrontend {
    fn parse(&self, path: &str, content: &str) -> Result<SourceFile, Diagnostic> {
        SourceFile::from_yaml_str(path, content).map_err(|e| {
            Diagnostic::error(
                DiagnosticCode::INVALID_STRUCTURE,
                format!("'{}' is not a valid workflow AST: {}", path, e),
                Span::file(path),
            )
        })
    }
}

/// Resolver that knows no files
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFiles;

impl FileResolver for NoFiles {
    fn resolve(&self, _path: &str) -> Option<String> {
        None
    }
}
