//! Shell script normalization
//!
//! Scripts keep the indentation they had inside the source file. Before
//! emission the common indentation is removed: the smallest leading
//! whitespace width over all non-blank lines (a tab counts as one
//! character) is stripped from every line, blank lines become empty, and
//! leading and trailing blank lines are dropped.

/// Strip the common indentation of a script
pub fn normalize_script(script: &str) -> String {
    let lines: Vec<&str> = script.lines().collect();

    let indent = lines
        .iter()
        .filter(|line| !is_blank(line))
        .map(|line| leading_whitespace(line))
        .min()
        .unwrap_or(0);

    let stripped: Vec<&str> = lines
        .iter()
        .map(|line| {
            if is_blank(line) {
                ""
            } else {
                strip_chars(line, indent)
            }
        })
        .collect();

    let first = stripped.iter().position(|line| !line.is_empty());
    let last = stripped.iter().rposition(|line| !line.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => stripped[first..=last].join("\n"),
        _ => String::new(),
    }
}

/// Number of leading whitespace characters
fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn strip_chars(line: &str, count: usize) -> &str {
    match line.char_indices().nth(count) {
        Some((offset, _)) => &line[offset..],
        None => "",
    }
}
