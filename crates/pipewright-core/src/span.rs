//! Source locations

use serde::{Deserialize, Serialize};
use std::fmt;

/// A region of a source file.
///
/// Lines and columns are 1-based. A default span (all zeros) means the
/// location is unknown, e.g. for diagnostics about a whole file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub start_line: u32,
    #[serde(default)]
    pub start_col: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub end_col: u32,
}

impl Span {
    /// Create a span covering `start_line:start_col` to `end_line:end_col`
    pub fn new(
        file: impl Into<String>,
        start_line: u32,
        start_col: u32,
        end_line: u32,
        end_col: u32,
    ) -> Self {
        Self {
            file: file.into(),
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a span pointing at a single line
    pub fn line(file: impl Into<String>, line: u32) -> Self {
        Self::new(file, line, 1, line, 1)
    }

    /// Span standing for an entire file
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    /// Return the same region attributed to another file
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.start_line == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}:{}", self.file, self.start_line, self.start_col)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new("ci/main.flow", 3, 5, 3, 9).to_string(), "ci/main.flow:3:5");
        assert_eq!(Span::file("ci/main.flow").to_string(), "ci/main.flow");
    }

    #[test]
    fn test_span_wire_shape() {
        let json = serde_json::to_value(Span::new("a.flow", 1, 2, 3, 4)).unwrap();
        assert_eq!(json["startLine"], 1);
        assert_eq!(json["endCol"], 4);
    }
}
