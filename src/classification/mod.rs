//! Clause classification against a fixed legal vocabulary.
//!
//! Each clause type carries an ordered list of case-insensitive indicator
//! patterns drawn from legal boilerplate. A clause is scored per type by the
//! number of distinct indicators that match (each contributes at most one,
//! regardless of multiplicity), and the strictly highest score wins with ties
//! resolved in declaration order. Confidence is the winning score divided by
//! the sum of all type scores — how dominant the winning signal was among all
//! signals found — not the winning score alone.

/// Regex entity extraction for dates, money, organizations, and people.
pub mod entities;
/// Clause title extraction heuristics.
pub mod title;

use crate::model::{ClauseType, ExtractedEntities};
use entities::EntityExtractor;
use regex::{Regex, RegexBuilder};

/// Confidence assigned when no indicator matched anywhere.
const FALLBACK_CONFIDENCE: f32 = 0.5;

/// Indicator patterns per clause type, in declaration (tie-break) order.
const INDICATORS: &[(ClauseType, &[&str])] = &[
    (
        ClauseType::Confidentiality,
        &[
            r"confidential",
            r"non-?disclosure",
            r"proprietary information",
            r"trade secret",
        ],
    ),
    (
        ClauseType::Termination,
        &[
            r"terminat(e|es|ed|ion)",
            r"expir(e|es|ation|y)",
            r"end of (the )?term",
            r"notice of termination",
        ],
    ),
    (
        ClauseType::Liability,
        &[
            r"liabilit(y|ies)",
            r"indemnif(y|ies|ied|ication)",
            r"hold harmless",
            r"\bdamages\b",
            r"limitation of liability",
        ],
    ),
    (
        ClauseType::Payment,
        &[
            r"\bpayment(s)?\b",
            r"\bfee(s)?\b",
            r"invoice",
            r"compensation",
            r"payable",
        ],
    ),
    (
        ClauseType::IntellectualProperty,
        &[
            r"intellectual property",
            r"copyright",
            r"patent",
            r"trademark",
            r"work product",
        ],
    ),
    (
        ClauseType::GoverningLaw,
        &[
            r"governing law",
            r"governed by",
            r"jurisdiction",
            r"\bvenue\b",
            r"laws of the",
        ],
    ),
    (
        ClauseType::Warranty,
        &[
            r"warrant(y|ies|s)",
            r"representation(s)?",
            r"as[- ]is",
            r"merchantability",
            r"fitness for a particular purpose",
        ],
    ),
    (
        ClauseType::ForceMajeure,
        &[
            r"force majeure",
            r"act(s)? of god",
            r"beyond .{0,30}reasonable control",
            r"natural disaster",
        ],
    ),
    (
        ClauseType::Assignment,
        &[
            r"assign(ment|s|able|ed)?",
            r"transfer of rights",
            r"successors and assigns",
            r"\bdelegate\b",
        ],
    ),
    (
        ClauseType::Amendment,
        &[
            r"amend(ment|ments|ed)?",
            r"modif(y|ied|ication)",
            r"in writing and signed",
            r"\bwaiver\b",
        ],
    ),
    (
        ClauseType::EntireAgreement,
        &[
            r"entire agreement",
            r"supersede(s|d)?",
            r"prior (agreements|understandings)",
            r"integration clause",
        ],
    ),
    (
        ClauseType::Severability,
        &[
            r"severab(le|ility)",
            r"invalid or unenforceable",
            r"remain in full force",
        ],
    ),
];

/// Result of classifying one clause.
#[derive(Clone, Debug)]
pub struct Classification {
    /// Winning clause type, or [`ClauseType::General`] when nothing matched.
    pub clause_type: ClauseType,
    /// Confidence in `[0, 1]`; exactly `0.5` when nothing matched.
    pub confidence: f32,
    /// Entities extracted from the clause text.
    pub entities: ExtractedEntities,
}

/// Compiled indicator registry, built once at startup and shared by reference.
pub struct ClauseClassifier {
    table: Vec<(ClauseType, Vec<Regex>)>,
    entities: EntityExtractor,
}

impl ClauseClassifier {
    /// Compile the indicator table.
    pub fn new() -> Self {
        let table = INDICATORS
            .iter()
            .map(|(clause_type, patterns)| {
                let compiled = patterns.iter().map(|pattern| compile(pattern)).collect();
                (*clause_type, compiled)
            })
            .collect();
        Self {
            table,
            entities: EntityExtractor::new(),
        }
    }

    /// Classify one clause's text.
    pub fn classify(&self, text: &str) -> Classification {
        let mut best: Option<(ClauseType, usize)> = None;
        let mut total = 0usize;
        for (clause_type, patterns) in &self.table {
            let score = patterns
                .iter()
                .filter(|pattern| pattern.is_match(text))
                .count();
            total += score;
            // Only a strictly greater score overwrites the running maximum, so
            // ties resolve to the earliest declared type.
            if score > best.map_or(0, |(_, current)| current) {
                best = Some((*clause_type, score));
            }
        }

        let (clause_type, confidence) = match best {
            Some((clause_type, score)) => {
                let confidence = (score as f32 / total as f32).min(1.0);
                (clause_type, confidence)
            }
            None => (ClauseType::General, FALLBACK_CONFIDENCE),
        };

        Classification {
            clause_type,
            confidence,
            entities: self.entities.extract(text),
        }
    }
}

impl Default for ClauseClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("indicator pattern is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidentiality_clause_scores_multiple_indicators() {
        let classifier = ClauseClassifier::new();
        let result = classifier.classify(
            "The parties shall keep all proprietary information confidential and shall not disclose trade secrets.",
        );
        assert_eq!(result.clause_type, ClauseType::Confidentiality);
        assert!(result.confidence > 0.0);
        assert!(result.confidence <= 1.0);
    }

    #[test]
    fn termination_clause_wins_on_single_indicator() {
        let classifier = ClauseClassifier::new();
        let result =
            classifier.classify("Either party may terminate this agreement at any time without cause.");
        assert_eq!(result.clause_type, ClauseType::Termination);
        assert!((result.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_signal_falls_back_to_general_with_fixed_confidence() {
        let classifier = ClauseClassifier::new();
        let result = classifier.classify("The quick brown fox jumps over the lazy dog.");
        assert_eq!(result.clause_type, ClauseType::General);
        assert!((result.confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn confidence_reflects_dominance_not_raw_score() {
        let classifier = ClauseClassifier::new();
        // One confidentiality indicator plus one termination indicator: the
        // winner's share of the total signal is one half.
        let result = classifier
            .classify("Confidential materials must be returned upon expiration of the term.");
        assert!(result.confidence < 1.0);
        assert!(result.confidence >= 0.5 - f32::EPSILON);
    }

    #[test]
    fn ties_resolve_to_earliest_declared_type() {
        let classifier = ClauseClassifier::new();
        // "confidential" and "terminate" each contribute exactly one match.
        let result =
            classifier.classify("Confidential notices survive should either party terminate.");
        assert_eq!(result.clause_type, ClauseType::Confidentiality);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let classifier = ClauseClassifier::new();
        let result = classifier.classify("GOVERNING LAW: the laws of the State of Delaware.");
        assert_eq!(result.clause_type, ClauseType::GoverningLaw);
    }

    #[test]
    fn each_indicator_counts_at_most_once() {
        let classifier = ClauseClassifier::new();
        // "payment" repeated should not outscore two distinct liability hits.
        let result = classifier.classify(
            "Payment, payment, payment: the vendor shall hold harmless the client against damages.",
        );
        assert_eq!(result.clause_type, ClauseType::Liability);
    }
}
