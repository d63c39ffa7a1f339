//! Clause segmentation heuristics.
//!
//! Splitting strategies are attempted in strict priority order; the first one
//! producing a non-trivial result wins:
//!
//! 1. Numbered-section split on `N.` / `N.N.` markers at line starts, taken
//!    only when the split produces more than three raw fragments.
//! 2. Paragraph split on blank-line boundaries.
//! 3. Sentence grouping in runs of three as a fallback.
//!
//! Segmentation is total: it never fails, and any non-empty input yields at
//! least one clause (a single degraded clause covering the whole text when all
//! strategies discard everything). Empty or whitespace-only input yields zero
//! clauses, which callers must treat as a document with no analyzable content
//! rather than an error.

use regex::Regex;
use std::sync::LazyLock;

/// Sections shorter than this after a numbered split are treated as noise.
const MIN_SECTION_LEN: usize = 20;
/// Paragraphs and sentence groups shorter than this are assumed to be headers
/// or whitespace rather than real clauses.
const MIN_FRAGMENT_LEN: usize = 50;
/// Sentences grouped per clause by the fallback strategy.
const SENTENCES_PER_GROUP: usize = 3;
/// Minimum raw fragment count for the numbered-section split to win.
const MIN_NUMBERED_FRAGMENTS: usize = 4;

static SECTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\d+(?:\.\d+)*\.\s+").expect("section marker pattern is valid")
});
static SECTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)*)\.\s+").expect("section label pattern is valid")
});
static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("blank line pattern is valid"));
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("sentence end pattern is valid"));

/// One ordered clause candidate produced by segmentation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClauseCandidate {
    /// Dense zero-based position in final output order.
    pub position: usize,
    /// Section-number label parsed from the fragment head, when present.
    pub section_number: Option<String>,
    /// Trimmed clause text.
    pub text: String,
}

/// Split raw document text into ordered clause candidates.
///
/// Deterministic: the same input always yields the same output. Positions are
/// assigned densely starting at zero regardless of which strategy fired.
pub fn segment(text: &str) -> Vec<ClauseCandidate> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut fragments = numbered_sections(text);
    if fragments.is_empty() {
        fragments = paragraphs(text);
    }
    if fragments.is_empty() {
        fragments = sentence_groups(text);
    }
    if fragments.is_empty() {
        // Degraded result for pathological input: one clause, whole text.
        fragments = vec![text.trim().to_string()];
    }

    fragments
        .into_iter()
        .enumerate()
        .map(|(position, body)| {
            let section_number = leading_section_label(&body);
            ClauseCandidate {
                position,
                section_number,
                text: body,
            }
        })
        .collect()
}

/// Strategy 1: split at numbered-section markers.
///
/// Returns an empty vector when the marker split yields too few raw fragments
/// to look like a numbered contract, or when every fragment is noise.
fn numbered_sections(text: &str) -> Vec<String> {
    let mut cut_points: Vec<usize> = SECTION_MARKER.find_iter(text).map(|m| m.start()).collect();
    if cut_points.is_empty() {
        return Vec::new();
    }
    if cut_points.first().copied() != Some(0) {
        cut_points.insert(0, 0);
    }
    if cut_points.len() < MIN_NUMBERED_FRAGMENTS {
        return Vec::new();
    }

    let mut sections = Vec::new();
    for (idx, &start) in cut_points.iter().enumerate() {
        let end = cut_points.get(idx + 1).copied().unwrap_or(text.len());
        let fragment = text[start..end].trim();
        if fragment.len() >= MIN_SECTION_LEN {
            sections.push(fragment.to_string());
        }
    }
    sections
}

/// Strategy 2: split on blank-line boundaries.
fn paragraphs(text: &str) -> Vec<String> {
    BLANK_LINE
        .split(text)
        .map(str::trim)
        .filter(|fragment| fragment.len() >= MIN_FRAGMENT_LEN)
        .map(ToString::to_string)
        .collect()
}

/// Strategy 3: group sentences in fixed-size runs.
fn sentence_groups(text: &str) -> Vec<String> {
    let sentences = split_sentences(text);
    sentences
        .chunks(SENTENCES_PER_GROUP)
        .map(|group| group.join(" "))
        .map(|group| group.trim().to_string())
        .filter(|group| group.len() >= MIN_FRAGMENT_LEN)
        .collect()
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last = 0;
    for boundary in SENTENCE_END.find_iter(text) {
        let sentence = text[last..boundary.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last = boundary.end();
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

fn leading_section_label(text: &str) -> Option<String> {
    SECTION_LABEL
        .captures(text)
        .map(|captures| captures[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMBERED_CONTRACT: &str = "\
1. DEFINITIONS\nCapitalized terms used in this agreement have the meanings assigned below.\n\
2. SERVICES\nThe vendor shall provide the services described in the statement of work.\n\
3. COMPENSATION\nThe client shall pay the fees set forth in Exhibit A within thirty days.\n\
4. CONFIDENTIALITY\nEach party shall protect the other party's confidential information.\n";

    #[test]
    fn numbered_split_wins_with_enough_sections() {
        let clauses = segment(NUMBERED_CONTRACT);
        assert_eq!(clauses.len(), 4);
        assert_eq!(clauses[0].section_number.as_deref(), Some("1"));
        assert_eq!(clauses[3].section_number.as_deref(), Some("4"));
        assert!(clauses[1].text.contains("statement of work"));
    }

    #[test]
    fn numbered_split_handles_subsection_labels() {
        let text = "\
1.1. Scope\nThe scope of this engagement covers ongoing maintenance work.\n\
1.2. Deliverables\nThe vendor shall deliver monthly status reports to the client.\n\
2.1. Fees\nFees are payable in arrears upon receipt of a valid invoice.\n\
2.2. Expenses\nPre-approved travel expenses are reimbursed at documented cost.\n";
        let clauses = segment(text);
        assert_eq!(clauses.len(), 4);
        assert_eq!(clauses[0].section_number.as_deref(), Some("1.1"));
        assert_eq!(clauses[2].section_number.as_deref(), Some("2.1"));
    }

    #[test]
    fn paragraph_split_applies_below_numbered_threshold() {
        let text = "1. CONFIDENTIALITY\nThe parties shall keep all proprietary information confidential and shall not disclose trade secrets.\n\n2. TERMINATION\nEither party may terminate this agreement at any time without cause.";
        let clauses = segment(text);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].section_number.as_deref(), Some("1"));
        assert_eq!(clauses[1].section_number.as_deref(), Some("2"));
        assert!(clauses[1].text.starts_with("2. TERMINATION"));
    }

    #[test]
    fn short_paragraphs_are_discarded_as_headers() {
        let text = "HEADER\n\nThis paragraph is comfortably longer than fifty characters and survives.\n\nfooter";
        let clauses = segment(text);
        assert_eq!(clauses.len(), 1);
        assert!(clauses[0].text.starts_with("This paragraph"));
    }

    #[test]
    fn unstructured_block_becomes_one_paragraph_clause() {
        let text = "The first sentence sets the scene for this unstructured block. \
The second sentence continues without any paragraph breaks at all.";
        let clauses = segment(text);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].text, text);
    }

    #[test]
    fn sentence_grouping_rescues_short_scattered_paragraphs() {
        // Every paragraph is under the 50-character floor, so both structural
        // strategies come up empty and sentence grouping takes over.
        let text = "Notice must be given promptly.\n\n\
Records are kept for two years.\n\n\
Payment is due on receipt.\n\n\
Disputes go to arbitration.\n\n\
Either side may audit annually.\n\n\
Renewal requires fresh consent.";
        let clauses = segment(text);
        assert_eq!(clauses.len(), 2);
        assert!(clauses[0].text.contains("Payment is due"));
        assert!(clauses[1].text.contains("Renewal requires"));
    }

    #[test]
    fn pathological_input_degrades_to_single_clause() {
        let clauses = segment("hello world.");
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].text, "hello world.");
        assert_eq!(clauses[0].position, 0);
        assert!(clauses[0].section_number.is_none());
    }

    #[test]
    fn empty_and_whitespace_input_yield_no_clauses() {
        assert!(segment("").is_empty());
        assert!(segment("  \n\t \n").is_empty());
    }

    #[test]
    fn positions_are_dense_and_zero_based() {
        let clauses = segment(NUMBERED_CONTRACT);
        for (expected, clause) in clauses.iter().enumerate() {
            assert_eq!(clause.position, expected);
        }
    }

    #[test]
    fn segmentation_is_deterministic() {
        assert_eq!(segment(NUMBERED_CONTRACT), segment(NUMBERED_CONTRACT));
    }
}
