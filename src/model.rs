//! Core data model: documents, clauses, and processing jobs.
//!
//! A [`Document`] owns its [`Clause`]s and [`ProcessingJob`]s; deleting the
//! document cascades to both. Clauses are created in bulk once analysis
//! finishes and are never updated afterwards — re-analysis replaces the whole
//! set. Jobs are retained across processing cycles as an audit trail until the
//! retention sweep purges them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Upper bound on stored entries per extracted-entity kind.
///
/// Entity lists are order-preserving and not deduplicated; the cap alone keeps
/// pathological documents from ballooning clause rows.
pub const MAX_ENTITIES_PER_KIND: usize = 10;

/// Lifecycle status of an ingested document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Raw file received; no processing attempted yet.
    Uploaded,
    /// A worker is currently running the analysis pipeline.
    Processing,
    /// Analysis finished and the clause set is persisted.
    Analyzed,
    /// A document-level stage failed; any persisted clauses are incomplete.
    Failed,
}

/// One ingested contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier.
    pub id: Uuid,
    /// Owning user; documents are visible to their owner only.
    pub user_id: Uuid,
    /// Plain text produced by the extraction collaborator, once available.
    pub raw_text: Option<String>,
    /// Metadata captured alongside extraction, once available.
    pub metadata: Option<ExtractionMetadata>,
    /// Current lifecycle status.
    pub status: DocumentStatus,
    /// When the document was first received.
    pub uploaded_at: OffsetDateTime,
    /// When analysis last completed, if it ever did.
    pub processed_at: Option<OffsetDateTime>,
}

impl Document {
    /// Create a freshly uploaded document owned by `user_id`.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            raw_text: None,
            metadata: None,
            status: DocumentStatus::Uploaded,
            uploaded_at: OffsetDateTime::now_utc(),
            processed_at: None,
        }
    }
}

/// Metadata observed while extracting text from the source file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Estimated page count of the source document.
    pub page_count: usize,
    /// Detected document category (e.g. `nda`, `lease`), when recognizable.
    pub document_type: Option<String>,
    /// Party names detected in the text, capped and order-preserving.
    pub parties: Vec<String>,
    /// Date strings detected in the text, capped and order-preserving.
    pub dates: Vec<String>,
}

/// Closed vocabulary of clause categories.
///
/// Declaration order is significant: classification ties resolve to the
/// earliest declared type, and `General` is the zero-signal fallback.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseType {
    /// Non-disclosure and confidentiality obligations.
    Confidentiality,
    /// Termination rights and notice requirements.
    Termination,
    /// Liability, indemnification, and damages allocation.
    Liability,
    /// Payment terms, fees, and invoicing.
    Payment,
    /// Intellectual-property ownership and licensing.
    IntellectualProperty,
    /// Governing law, jurisdiction, and venue.
    GoverningLaw,
    /// Warranties and representations.
    Warranty,
    /// Force majeure carve-outs.
    ForceMajeure,
    /// Assignment and transfer of rights.
    Assignment,
    /// Amendment and modification mechanics.
    Amendment,
    /// Entire-agreement / integration language.
    EntireAgreement,
    /// Severability language.
    Severability,
    /// Fallback when no category signal is present.
    General,
}

impl ClauseType {
    /// Snake-case label matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confidentiality => "confidentiality",
            Self::Termination => "termination",
            Self::Liability => "liability",
            Self::Payment => "payment",
            Self::IntellectualProperty => "intellectual_property",
            Self::GoverningLaw => "governing_law",
            Self::Warranty => "warranty",
            Self::ForceMajeure => "force_majeure",
            Self::Assignment => "assignment",
            Self::Amendment => "amendment",
            Self::EntireAgreement => "entire_agreement",
            Self::Severability => "severability",
            Self::General => "general",
        }
    }
}

/// Named entities pulled out of a clause's text.
///
/// Raw extractor output is accepted as-is: order-preserving, no validation,
/// no deduplication beyond the [`MAX_ENTITIES_PER_KIND`] cap.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    /// Date strings in source order.
    pub dates: Vec<String>,
    /// Monetary amounts in source order.
    pub money: Vec<String>,
    /// Organization names in source order.
    pub organizations: Vec<String>,
    /// People names in source order.
    pub people: Vec<String>,
}

/// Risk level assigned to a clause.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// No risk indicators matched, or only reassuring language found.
    Low,
    /// At least one cautionary indicator matched.
    Medium,
    /// At least one unfavorable-terms indicator matched.
    High,
}

/// Structured warning attached to a clause by the risk scorer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskFlag {
    /// Severity tier of the matched indicator.
    pub severity: RiskLevel,
    /// Human-readable explanation for the flag.
    pub message: String,
    /// Identifier of the indicator pattern that matched.
    pub pattern: String,
}

/// One segmented, analyzed unit of contract text.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clause {
    /// Unique clause identifier.
    pub id: Uuid,
    /// Parent document.
    pub document_id: Uuid,
    /// Zero-based position within the document, assigned at segmentation time.
    pub position: usize,
    /// Section-number label (e.g. `3.2`) when the source text carried one.
    pub section_number: Option<String>,
    /// Extracted heading or summary title, when one could be derived.
    pub title: Option<String>,
    /// Full clause text.
    pub text: String,
    /// Whitespace-delimited word count of `text`.
    pub word_count: usize,
    /// Assigned clause category.
    pub clause_type: ClauseType,
    /// Classification confidence in `[0, 1]`.
    pub confidence: f32,
    /// Entities extracted from the clause text.
    pub entities: ExtractedEntities,
    /// Assigned risk level.
    pub risk_level: RiskLevel,
    /// Risk flags in indicator order; one entry per matching pattern.
    pub risk_flags: Vec<RiskFlag>,
    /// Derived review marker; true exactly when `risk_level` is not low.
    pub requires_review: bool,
    /// Semantic embedding of the clause text.
    pub embedding: Vec<f32>,
}

/// Kind of work a [`ProcessingJob`] represents.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Extraction-and-analysis pipeline run (the only kind produced here).
    Extraction,
    /// Reserved: standalone re-analysis of already-extracted text.
    Analysis,
    /// Reserved: cross-document comparison.
    Comparison,
}

/// Lifecycle status of a processing job.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Enqueued, not yet claimed by a worker.
    Pending,
    /// Claimed and running.
    Processing,
    /// Finished successfully; `summary` is populated.
    Completed,
    /// Finished unsuccessfully; `error` is populated.
    Failed,
}

impl JobStatus {
    /// Whether the status is one of the two terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Result summary recorded on a completed job.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct JobSummary {
    /// Character length of the extracted text.
    pub text_length: usize,
    /// Page count reported by extraction.
    pub page_count: usize,
    /// Whitespace-delimited word count of the extracted text.
    pub word_count: usize,
    /// Number of clauses successfully persisted.
    pub clause_count: usize,
}

/// One attempt to run the pipeline against a document.
///
/// A job reaches exactly one terminal state. Queue-level retries re-run the
/// same job instance while it is still `Processing`; they never move a
/// terminal record back to `Pending`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessingJob {
    /// Unique job identifier.
    pub id: Uuid,
    /// Parent document.
    pub document_id: Uuid,
    /// Kind of work performed.
    pub job_type: JobType,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// When the job record was created.
    pub created_at: OffsetDateTime,
    /// When a worker first claimed the job.
    pub started_at: Option<OffsetDateTime>,
    /// When the job reached a terminal state.
    pub completed_at: Option<OffsetDateTime>,
    /// Failure detail; present only when `status` is `Failed`.
    pub error: Option<String>,
    /// Result summary; present only when `status` is `Completed`.
    pub summary: Option<JobSummary>,
}

impl ProcessingJob {
    /// Create a pending job of the given type for `document_id`.
    pub fn new(document_id: Uuid, job_type: JobType) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            job_type,
            status: JobStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
            started_at: None,
            completed_at: None,
            error: None,
            summary: None,
        }
    }
}
