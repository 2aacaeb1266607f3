use regex::Regex;
use std::sync::LazyLock;

/// Capitalized word runs: naive proper-noun phrase detection.
static ENTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)*)\b").expect("entity pattern is valid")
});

/// Candidate entity labels in `text`, left to right.
///
/// Matches never overlap and each position takes the longest phrase, so
/// "New York City" is one candidate rather than three.
pub fn find_candidates(text: &str) -> impl Iterator<Item = &str> {
    ENTITY_PATTERN.find_iter(text).map(|m| m.as_str())
}

/// Entity id for a surface label: lowercase, spaces replaced with underscores
pub fn normalize(label: &str) -> String {
    label.to_lowercase().replace(' ', "_")
}
