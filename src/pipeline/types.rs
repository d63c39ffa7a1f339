//! Payloads, outcomes, and error types for the analysis pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::embedding::EmbeddingError;
use crate::extract::ExtractionError;
use crate::queue::QueueError;
use crate::store::StoreError;

/// Queue payload describing one document-analysis run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJobPayload {
    /// Document to analyze.
    pub document_id: Uuid,
    /// Source file on local disk.
    pub file_path: PathBuf,
    /// Declared file type of the source.
    pub file_type: String,
    /// Owner of the document.
    pub user_id: Uuid,
    /// Job record tracking this run.
    pub job_id: Uuid,
}

/// Document-level pipeline failure. Any of these fails the whole run; clause
/// failures are handled separately and never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text extraction from the source file failed.
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    /// Segmentation panicked or otherwise broke down.
    #[error("Segmentation failed: {0}")]
    Segmentation(String),
    /// A persistence operation outside per-clause inserts failed.
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

/// Failure of a single clause during per-clause analysis or persistence.
///
/// Tagged with the clause position so a partial run can report exactly which
/// clauses are missing.
#[derive(Debug, Error)]
pub enum ClauseProcessingError {
    /// Embedding generation failed for the clause text.
    #[error("Embedding failed for clause {position}: {source}")]
    Embedding {
        /// Position of the affected clause.
        position: usize,
        /// Underlying embedding error.
        #[source]
        source: EmbeddingError,
    },
    /// The analyzed clause could not be persisted.
    #[error("Persist failed for clause {position}: {source}")]
    Persist {
        /// Position of the affected clause.
        position: usize,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
}

impl ClauseProcessingError {
    /// Position of the clause that failed.
    pub fn position(&self) -> usize {
        match self {
            Self::Embedding { position, .. } | Self::Persist { position, .. } => *position,
        }
    }
}

/// Result of one successful pipeline run.
#[derive(Clone, Copy, Debug)]
pub struct AnalysisOutcome {
    /// Clauses persisted.
    pub clause_count: usize,
    /// Clauses skipped because their analysis or persistence failed.
    pub failed_clauses: usize,
    /// Character length of the extracted text.
    pub text_length: usize,
    /// Page count reported by extraction.
    pub page_count: usize,
    /// Whitespace-delimited word count of the extracted text.
    pub word_count: usize,
}

/// Errors raised while submitting a document for analysis.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Creating the document or job record failed.
    #[error("Failed to record submission: {0}")]
    Store(#[from] StoreError),
    /// The job could not be enqueued.
    #[error("Failed to enqueue analysis job: {0}")]
    Queue(#[from] QueueError),
}

/// Identifiers handed back to the submitter for status polling.
#[derive(Clone, Copy, Debug)]
pub struct SubmitReceipt {
    /// Newly created document.
    pub document_id: Uuid,
    /// Job record tracking the analysis run.
    pub job_id: Uuid,
}
