//! Regex entity extraction for dates, money amounts, organizations, and people.
//!
//! A lightweight stand-in for a natural-language toolkit: raw string lists in
//! source order, accepted as-is with no validation and no deduplication beyond
//! the per-kind cap.

use crate::model::{ExtractedEntities, MAX_ENTITIES_PER_KIND};
use regex::Regex;

const DATE_PATTERNS: &[&str] = &[
    r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b",
    r"\b\d{4}-\d{2}-\d{2}\b",
    r"(?i)\b(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2},?\s+\d{4}\b",
];

const MONEY_PATTERNS: &[&str] = &[
    r"\$\s?\d[\d,]*(?:\.\d{1,2})?",
    r"(?i)\b\d[\d,]*(?:\.\d{1,2})?\s?(?:dollars|usd|eur|euros|gbp)\b",
];

const ORGANIZATION_PATTERNS: &[&str] = &[
    r"\b(?:[A-Z][A-Za-z&'-]+[ ]+)+(?:Inc\.?|LLC|Ltd\.?|Corp\.?|Corporation|Company|GmbH)\b",
];

const PEOPLE_PATTERNS: &[&str] =
    &[r"\b(?:Mr|Mrs|Ms|Dr)\.?\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?\b"];

/// Compiled entity patterns, built once and shared by reference.
pub struct EntityExtractor {
    dates: Vec<Regex>,
    money: Vec<Regex>,
    organizations: Vec<Regex>,
    people: Vec<Regex>,
}

impl EntityExtractor {
    /// Compile the entity pattern sets.
    pub fn new() -> Self {
        Self {
            dates: compile_all(DATE_PATTERNS),
            money: compile_all(MONEY_PATTERNS),
            organizations: compile_all(ORGANIZATION_PATTERNS),
            people: compile_all(PEOPLE_PATTERNS),
        }
    }

    /// Extract entity strings from `text`, in source order per kind.
    pub fn extract(&self, text: &str) -> ExtractedEntities {
        ExtractedEntities {
            dates: collect_matches(&self.dates, text),
            money: collect_matches(&self.money, text),
            organizations: collect_matches(&self.organizations, text),
            people: collect_matches(&self.people, text),
        }
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("entity pattern is valid"))
        .collect()
}

/// Gather matches across all patterns of one kind, ordered by source offset.
fn collect_matches(patterns: &[Regex], text: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = patterns
        .iter()
        .flat_map(|pattern| pattern.find_iter(text))
        .map(|m| (m.start(), m.as_str().to_string()))
        .collect();
    found.sort_by_key(|(start, _)| *start);
    found.truncate(MAX_ENTITIES_PER_KIND);
    found.into_iter().map(|(_, value)| value).collect()
}
