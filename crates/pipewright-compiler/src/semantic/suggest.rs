//! "Did you mean" suggestions

/// Nearest candidate to `name` within `max_distance` edits.
///
/// Ties go to the candidate seen first, so callers should pass candidates in
/// a deterministic order. An exact match is never suggested.
pub fn suggest<'a, I>(name: &str, candidates: I, max_distance: usize) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        if candidate == name {
            continue;
        }
        let distance = levenshtein_distance(name, candidate);
        if distance > max_distance {
            continue;
        }
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(candidate, _)| candidate.to_string())
}

/// Hint text for a suggestion
pub fn did_you_mean(suggestion: Option<String>) -> Option<String> {
    suggestion.map(|s| format!("did you mean '{}'?", s))
}

/// Calculate Levenshtein distance between two strings
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    if s1_chars.is_empty() {
        return s2_chars.len();
    }
    if s2_chars.is_empty() {
        return s1_chars.len();
    }

    let mut previous: Vec<usize> = (0..=s2_chars.len()).collect();
    let mut current = vec![0; s2_chars.len() + 1];

    for (i, &c1) in s1_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, &c2) in s2_chars.iter().enumerate() {
            let cost = if c1 == c2 { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1) // deletion
                .min(current[j] + 1) // insertion
                .min(previous[j] + cost); // substitution
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[s2_chars.len()]
}
