//! Clause title extraction heuristics.
//!
//! Tried in order: an all-caps heading line at clause start, a numbered
//! all-caps heading, a `Label:` prefix, then a truncated first sentence when
//! it is short enough to read as a summary. Clauses with none of these get no
//! title.

use regex::Regex;
use std::sync::LazyLock;

/// Longest line still treated as a heading.
const MAX_HEADING_LEN: usize = 80;
/// First sentences at or beyond this length yield no title.
const MAX_SENTENCE_TITLE_LEN: usize = 100;
/// Truncation point for sentence-derived titles.
const TRUNCATED_TITLE_LEN: usize = 50;

static NUMBERED_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(?:\.\d+)*\.?\s+(.+)$").expect("numbered heading pattern is valid")
});
static LABEL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][A-Za-z0-9 ]{2,40}):").expect("label prefix pattern is valid")
});
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]").expect("sentence end pattern is valid"));

/// Derive a display title for a clause, when one can be found.
pub fn extract_title(text: &str) -> Option<String> {
    let first_line = text.lines().next()?.trim();

    if is_all_caps_heading(first_line) {
        return Some(first_line.to_string());
    }

    if let Some(captures) = NUMBERED_HEADING.captures(first_line) {
        let rest = captures[1].trim();
        if is_all_caps_heading(rest) {
            return Some(rest.to_string());
        }
    }

    if let Some(captures) = LABEL_PREFIX.captures(first_line) {
        return Some(captures[1].trim().to_string());
    }

    sentence_title(text)
}

/// A heading starts with a letter, carries no lowercase letters, and stays
/// within heading length.
fn is_all_caps_heading(line: &str) -> bool {
    if line.is_empty() || line.len() > MAX_HEADING_LEN {
        return false;
    }
    let mut chars = line.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_uppercase());
    starts_with_letter && !line.chars().any(|c| c.is_lowercase())
}

fn sentence_title(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let sentence = match SENTENCE_END.find(trimmed) {
        Some(boundary) => trimmed[..boundary.end()].trim(),
        None => trimmed,
    };

    let length = sentence.chars().count();
    if length >= MAX_SENTENCE_TITLE_LEN {
        return None;
    }
    if length > TRUNCATED_TITLE_LEN {
        let truncated: String = sentence.chars().take(TRUNCATED_TITLE_LEN).collect();
        return Some(format!("{truncated}..."));
    }
    Some(sentence.to_string())
}
