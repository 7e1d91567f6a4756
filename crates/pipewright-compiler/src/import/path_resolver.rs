//! Import path resolution
//!
//! Import paths are resolved against the importing file's directory and
//! normalized to a single canonical form: `/`-separated, project-relative,
//! with `.` segments dropped and `..` segments collapsed. Two spellings of
//! the same file therefore always produce the same string.

use pipewright_core::{Diagnostic, DiagnosticCode, Span};

/// A successfully resolved import path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    /// Canonical project-relative path
    pub path: String,

    /// Non-fatal findings (absolute path, escape from the project root)
    pub warnings: Vec<Diagnostic>,
}

/// An import path that names no source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedImport {
    pub error: Diagnostic,

    /// Findings made before the path was rejected
    pub warnings: Vec<Diagnostic>,
}

impl RejectedImport {
    /// Warnings first, then the error
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        let mut diagnostics = self.warnings;
        diagnostics.push(self.error);
        diagnostics
    }
}

/// Canonical form of a path, plus what normalization noticed about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    pub path: String,
    pub absolute: bool,
    pub escapes_root: bool,
}

/// Resolves import paths written in a source file
#[derive(Debug, Clone)]
pub struct PathResolver {
    extension: String,
}

impl PathResolver {
    /// Create a resolver requiring the given source extension (without dot)
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Resolve `import_path` as written in `from_file`.
    ///
    /// Absolute paths are read from the project root and paths climbing above
    /// it are kept as written; both resolve with a warning. A path that does
    /// not name a source file (missing extension) is an error, reported
    /// together with any warnings already found.
    pub fn resolve(
        &self,
        import_path: &str,
        from_file: &str,
        span: &Span,
    ) -> Result<ResolvedImport, RejectedImport> {
        let normalized = resolve_against(import_path, from_file);
        let mut warnings = Vec::new();

        if normalized.absolute {
            warnings.push(
                Diagnostic::warning(
                    DiagnosticCode::ABSOLUTE_IMPORT,
                    format!(
                        "absolute import path '{}' is read from the project root",
                        import_path
                    ),
                    span.clone(),
                )
                .with_hint("use a path relative to the importing file"),
            );
        }

        if normalized.escapes_root {
            warnings.push(Diagnostic::warning(
                DiagnosticCode::IMPORT_ESCAPES_ROOT,
                format!(
                    "import path '{}' resolves to '{}', outside the project root",
                    import_path, normalized.path
                ),
                span.clone(),
            ));
        }

        if !self.has_source_extension(&normalized.path) {
            let error = Diagnostic::error(
                DiagnosticCode::MISSING_EXTENSION,
                format!(
                    "import path '{}' must name a '.{}' file",
                    import_path, self.extension
                ),
                span.clone(),
            )
            .with_hint(format!("write '{}.{}'", import_path.trim_end_matches('/'), self.extension));
            return Err(RejectedImport { error, warnings });
        }

        Ok(ResolvedImport {
            path: normalized.path,
            warnings,
        })
    }

    fn has_source_extension(&self, path: &str) -> bool {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((stem, ext)) => !stem.is_empty() && ext == self.extension,
            None => false,
        }
    }
}

/// Canonical form of a project-relative file path
pub fn normalize_path(path: &str) -> String {
    normalize(path).path
}

/// Normalize a path on its own, without an importing file
pub fn normalize(path: &str) -> NormalizedPath {
    let unified = path.replace('\\', "/");
    let (absolute, rest) = split_root(&unified);
    let (segments, escapes_root) = collapse(rest.split('/'));
    NormalizedPath {
        path: segments.join("/"),
        absolute,
        escapes_root,
    }
}

/// Resolve `import_path` relative to the directory of `from_file`
pub fn resolve_against(import_path: &str, from_file: &str) -> NormalizedPath {
    let unified = import_path.replace('\\', "/");
    let (absolute, rest) = split_root(&unified);
    if absolute {
        let (segments, escapes_root) = collapse(rest.split('/'));
        return NormalizedPath {
            path: segments.join("/"),
            absolute,
            escapes_root,
        };
    }

    let from = normalize_path(from_file);
    let directory = match from.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    };
    let (segments, escapes_root) = collapse(directory.split('/').chain(rest.split('/')));
    NormalizedPath {
        path: segments.join("/"),
        absolute: false,
        escapes_root,
    }
}

/// Split a leading root (`/` or a drive letter) from a `/`-separated path
fn split_root(path: &str) -> (bool, &str) {
    if let Some(rest) = path.strip_prefix('/') {
        return (true, rest);
    }
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let rest = &path[2..];
        return (true, rest.strip_prefix('/').unwrap_or(rest));
    }
    (false, path)
}

fn collapse<'a>(segments: impl Iterator<Item = &'a str>) -> (Vec<&'a str>, bool) {
    let mut out: Vec<&str> = Vec::new();
    let mut escapes_root = false;
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => match out.last() {
                Some(last) if *last != ".." => {
                    out.pop();
                }
                _ => {
                    escapes_root = true;
                    out.push("..");
                }
            },
            other => out.push(other),
        }
    }
    (out, escapes_root)
}
