//! Deterministic risk scoring for clauses.
//!
//! Three fixed, ordered indicator tiers. High-risk indicators are evaluated
//! first; any match fixes the level at high with one flag per matching
//! pattern. Medium-risk indicators are evaluated only when no high indicator
//! matched. The low tier is informational reassurance language: it never
//! changes the level and is only consulted when the other tiers are silent.
//! `requires_review` is derived, true exactly when the level is not low.

use crate::model::{RiskFlag, RiskLevel};
use regex::{Regex, RegexBuilder};

/// Flag message for the high tier.
const HIGH_MESSAGE: &str = "contains potentially unfavorable terms";
/// Flag message for the medium tier.
const MEDIUM_MESSAGE: &str = "may require careful review";
/// Flag message for the informational low tier.
const LOW_MESSAGE: &str = "contains standard protective language";

const HIGH_INDICATORS: &[(&str, &str)] = &[
    ("unlimited-liability", r"unlimited liabilit"),
    ("indemnification", r"indemnif(y|ies|ied|ication)"),
    ("liquidated-damages", r"liquidated damages"),
    ("sole-discretion", r"sole discretion"),
    ("waiver-of-rights", r"waiv(e|es|er) (of )?(any|all)"),
    ("irrevocable", r"irrevocabl"),
    ("penalty", r"\bpenalt(y|ies)"),
    ("non-compete", r"non-?compete"),
    ("personal-guarantee", r"personal guarantee"),
];

const MEDIUM_INDICATORS: &[(&str, &str)] = &[
    ("at-any-time", r"at any time"),
    ("without-cause", r"without cause"),
    ("without-notice", r"without (prior )?notice"),
    ("automatic-renewal", r"automatic(ally)? renew"),
    ("exclusivity", r"\bexclusive\b"),
    ("sole-responsibility", r"solely? responsible"),
    ("termination-for-convenience", r"terminat\w* for convenience"),
    ("non-refundable", r"non-?refundable"),
];

const LOW_INDICATORS: &[(&str, &str)] = &[
    ("mutual-terms", r"\bmutual(ly)?\b"),
    ("reasonableness", r"\breasonable\b"),
    ("good-faith", r"good faith"),
    ("written-consent", r"written (consent|approval|notice)"),
    ("notice-period", r"\b\d+\s+days'?\s+(prior\s+)?(written\s+)?notice"),
];

struct Indicator {
    id: &'static str,
    pattern: Regex,
}

/// Result of scoring one clause.
#[derive(Clone, Debug)]
pub struct RiskAssessment {
    /// Assigned risk level.
    pub level: RiskLevel,
    /// One flag per matching indicator, in indicator order; not deduplicated.
    pub flags: Vec<RiskFlag>,
    /// Derived review marker; true exactly when `level` is not low.
    pub requires_review: bool,
}

/// Compiled risk indicator registry, built once at startup.
pub struct RiskScorer {
    high: Vec<Indicator>,
    medium: Vec<Indicator>,
    low: Vec<Indicator>,
}

impl RiskScorer {
    /// Compile the three indicator tiers.
    pub fn new() -> Self {
        Self {
            high: compile_tier(HIGH_INDICATORS),
            medium: compile_tier(MEDIUM_INDICATORS),
            low: compile_tier(LOW_INDICATORS),
        }
    }

    /// Score one clause's text.
    pub fn score(&self, text: &str) -> RiskAssessment {
        let high_flags = matching_flags(&self.high, text, RiskLevel::High, HIGH_MESSAGE);
        if !high_flags.is_empty() {
            return assessment(RiskLevel::High, high_flags);
        }

        let medium_flags = matching_flags(&self.medium, text, RiskLevel::Medium, MEDIUM_MESSAGE);
        if !medium_flags.is_empty() {
            return assessment(RiskLevel::Medium, medium_flags);
        }

        let low_flags = matching_flags(&self.low, text, RiskLevel::Low, LOW_MESSAGE);
        assessment(RiskLevel::Low, low_flags)
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn assessment(level: RiskLevel, flags: Vec<RiskFlag>) -> RiskAssessment {
    RiskAssessment {
        level,
        flags,
        requires_review: level != RiskLevel::Low,
    }
}

fn matching_flags(
    indicators: &[Indicator],
    text: &str,
    severity: RiskLevel,
    message: &str,
) -> Vec<RiskFlag> {
    indicators
        .iter()
        .filter(|indicator| indicator.pattern.is_match(text))
        .map(|indicator| RiskFlag {
            severity,
            message: message.to_string(),
            pattern: indicator.id.to_string(),
        })
        .collect()
}

fn compile_tier(table: &[(&'static str, &str)]) -> Vec<Indicator> {
    table
        .iter()
        .map(|(id, pattern)| Indicator {
            id,
            pattern: RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("risk indicator pattern is valid"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_indicator_dominates_regardless_of_medium_matches() {
        let scorer = RiskScorer::new();
        let result = scorer.score(
            "The client shall indemnify the vendor and may terminate at any time without cause.",
        );
        assert_eq!(result.level, RiskLevel::High);
        assert!(result.requires_review);
        assert!(result.flags.iter().all(|f| f.severity == RiskLevel::High));
        assert_eq!(result.flags[0].pattern, "indemnification");
        assert_eq!(result.flags[0].message, "contains potentially unfavorable terms");
    }

    #[test]
    fn medium_indicators_each_produce_a_flag() {
        let scorer = RiskScorer::new();
        let result =
            scorer.score("Either party may terminate this agreement at any time without cause.");
        assert_eq!(result.level, RiskLevel::Medium);
        assert!(result.requires_review);
        let patterns: Vec<&str> = result.flags.iter().map(|f| f.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["at-any-time", "without-cause"]);
        assert!(result.flags.iter().all(|f| f.message == "may require careful review"));
    }

    #[test]
    fn zero_matches_default_to_low_with_no_flags() {
        let scorer = RiskScorer::new();
        let result = scorer.score("The schedule in Exhibit B lists the deliverables.");
        assert_eq!(result.level, RiskLevel::Low);
        assert!(!result.requires_review);
        assert!(result.flags.is_empty());
    }

    #[test]
    fn reassurance_language_stays_low_with_informational_flags() {
        let scorer = RiskScorer::new();
        let result =
            scorer.score("The parties shall act in good faith and give 30 days written notice.");
        assert_eq!(result.level, RiskLevel::Low);
        assert!(!result.requires_review);
        assert!(!result.flags.is_empty());
        assert!(result.flags.iter().all(|f| f.severity == RiskLevel::Low));
    }

    #[test]
    fn case_is_ignored() {
        let scorer = RiskScorer::new();
        let result = scorer.score("UNLIMITED LIABILITY applies to all breaches.");
        assert_eq!(result.level, RiskLevel::High);
    }
}
