//! Persistence collaborator boundary and the in-memory reference store.
//!
//! The [`Store`] trait is the only mutable shared state in the system: all
//! writes are per-row inserts or updates scoped by document or clause
//! identifier, so workers never coordinate beyond the queue's single-claim
//! guarantee. [`InMemoryStore`] enforces the data-model invariants a
//! relational backend would carry in constraints: legal document status
//! transitions, clause position uniqueness, terminal-job immutability, and
//! cascade delete from a document to its dependents.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::embedding::{EmbeddingError, encode_vector, parse_vector};
use crate::model::{
    Clause, Document, DocumentStatus, ExtractionMetadata, ProcessingJob,
};

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document exists with the given identifier.
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),
    /// No job exists with the given identifier.
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),
    /// The requested document status change is not a legal transition.
    #[error("Invalid document status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition {
        /// Current status.
        from: DocumentStatus,
        /// Requested status.
        to: DocumentStatus,
    },
    /// The job already reached a terminal state and cannot be updated.
    #[error("Job {0} already reached a terminal state")]
    TerminalJob(Uuid),
    /// A clause with the same position already exists for the document.
    #[error("Duplicate clause position {position} in document {document_id}")]
    DuplicatePosition {
        /// Parent document.
        document_id: Uuid,
        /// Conflicting position.
        position: usize,
    },
    /// A stored embedding could not be decoded back into a vector.
    #[error("Stored embedding could not be decoded: {0}")]
    CorruptEmbedding(#[source] EmbeddingError),
}

/// Create/read/update access to documents, clauses, and jobs.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new document row.
    async fn create_document(&self, document: Document) -> Result<(), StoreError>;

    /// Fetch a document by id.
    async fn document(&self, id: Uuid) -> Result<Document, StoreError>;

    /// Persist extracted text and metadata on a document.
    async fn set_extracted(
        &self,
        id: Uuid,
        text: String,
        metadata: ExtractionMetadata,
    ) -> Result<(), StoreError>;

    /// Move a document to `status`, validating the transition. Reaching
    /// `Analyzed` also stamps `processed_at`.
    async fn update_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
    ) -> Result<(), StoreError>;

    /// Delete a document and cascade to its clauses and jobs.
    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError>;

    /// Insert one clause row.
    async fn insert_clause(&self, clause: Clause) -> Result<(), StoreError>;

    /// Fetch a document's clauses ordered by position.
    async fn clauses(&self, document_id: Uuid) -> Result<Vec<Clause>, StoreError>;

    /// Drop a document's clause set (used when re-analysis replaces it).
    /// Returns the number of removed rows.
    async fn clear_clauses(&self, document_id: Uuid) -> Result<usize, StoreError>;

    /// Insert a new job row.
    async fn create_job(&self, job: ProcessingJob) -> Result<(), StoreError>;

    /// Fetch a job by id.
    async fn job(&self, id: Uuid) -> Result<ProcessingJob, StoreError>;

    /// Replace a job row. Terminal jobs are immutable.
    async fn update_job(&self, job: ProcessingJob) -> Result<(), StoreError>;

    /// Delete terminal jobs that completed before `cutoff`. Returns the number
    /// of purged rows.
    async fn purge_terminal_jobs_before(&self, cutoff: OffsetDateTime)
    -> Result<usize, StoreError>;
}

/// Clause row as stored: the embedding lives in its textual storage form,
/// mirroring a TEXT column in a relational backend.
struct ClauseRow {
    clause: Clause,
    embedding_text: String,
}

#[derive(Default)]
struct Tables {
    documents: HashMap<Uuid, Document>,
    clauses: HashMap<Uuid, Vec<ClauseRow>>,
    jobs: HashMap<Uuid, ProcessingJob>,
}

/// In-memory [`Store`] implementation used by the worker binary and tests.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn transition_allowed(from: DocumentStatus, to: DocumentStatus) -> bool {
    use DocumentStatus::{Analyzed, Failed, Processing, Uploaded};
    // A new processing cycle (re-upload) may leave either terminal status.
    from == to
        || matches!(
            (from, to),
            (Uploaded, Processing)
                | (Processing, Analyzed)
                | (Processing, Failed)
                | (Analyzed, Processing)
                | (Failed, Processing)
        )
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_document(&self, document: Document) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.clauses.entry(document.id).or_default();
        tables.documents.insert(document.id, document);
        Ok(())
    }

    async fn document(&self, id: Uuid) -> Result<Document, StoreError> {
        let tables = self.tables.read().await;
        tables
            .documents
            .get(&id)
            .cloned()
            .ok_or(StoreError::DocumentNotFound(id))
    }

    async fn set_extracted(
        &self,
        id: Uuid,
        text: String,
        metadata: ExtractionMetadata,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let document = tables
            .documents
            .get_mut(&id)
            .ok_or(StoreError::DocumentNotFound(id))?;
        document.raw_text = Some(text);
        document.metadata = Some(metadata);
        Ok(())
    }

    async fn update_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let document = tables
            .documents
            .get_mut(&id)
            .ok_or(StoreError::DocumentNotFound(id))?;
        if !transition_allowed(document.status, status) {
            return Err(StoreError::InvalidStatusTransition {
                from: document.status,
                to: status,
            });
        }
        document.status = status;
        if status == DocumentStatus::Analyzed {
            document.processed_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .documents
            .remove(&id)
            .ok_or(StoreError::DocumentNotFound(id))?;
        tables.clauses.remove(&id);
        tables.jobs.retain(|_, job| job.document_id != id);
        Ok(())
    }

    async fn insert_clause(&self, clause: Clause) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.documents.contains_key(&clause.document_id) {
            return Err(StoreError::DocumentNotFound(clause.document_id));
        }
        let rows = tables.clauses.entry(clause.document_id).or_default();
        if rows.iter().any(|row| row.clause.position == clause.position) {
            return Err(StoreError::DuplicatePosition {
                document_id: clause.document_id,
                position: clause.position,
            });
        }

        let embedding_text = encode_vector(&clause.embedding);
        let mut stored = clause;
        stored.embedding = Vec::new();
        rows.push(ClauseRow {
            clause: stored,
            embedding_text,
        });
        rows.sort_by_key(|row| row.clause.position);
        Ok(())
    }

    async fn clauses(&self, document_id: Uuid) -> Result<Vec<Clause>, StoreError> {
        let tables = self.tables.read().await;
        if !tables.documents.contains_key(&document_id) {
            return Err(StoreError::DocumentNotFound(document_id));
        }
        let rows = tables.clauses.get(&document_id);
        let mut clauses = Vec::new();
        for row in rows.into_iter().flatten() {
            let mut clause = row.clause.clone();
            clause.embedding =
                parse_vector(&row.embedding_text).map_err(StoreError::CorruptEmbedding)?;
            clauses.push(clause);
        }
        Ok(clauses)
    }

    async fn clear_clauses(&self, document_id: Uuid) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.documents.contains_key(&document_id) {
            return Err(StoreError::DocumentNotFound(document_id));
        }
        let removed = tables
            .clauses
            .insert(document_id, Vec::new())
            .map_or(0, |rows| rows.len());
        Ok(removed)
    }

    async fn create_job(&self, job: ProcessingJob) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.documents.contains_key(&job.document_id) {
            return Err(StoreError::DocumentNotFound(job.document_id));
        }
        tables.jobs.insert(job.id, job);
        Ok(())
    }

    async fn job(&self, id: Uuid) -> Result<ProcessingJob, StoreError> {
        let tables = self.tables.read().await;
        tables
            .jobs
            .get(&id)
            .cloned()
            .ok_or(StoreError::JobNotFound(id))
    }

    async fn update_job(&self, job: ProcessingJob) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .jobs
            .get(&job.id)
            .ok_or(StoreError::JobNotFound(job.id))?;
        if existing.status.is_terminal() {
            return Err(StoreError::TerminalJob(job.id));
        }
        tables.jobs.insert(job.id, job);
        Ok(())
    }

    async fn purge_terminal_jobs_before(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.jobs.len();
        tables.jobs.retain(|_, job| {
            let finished_before_cutoff = job
                .completed_at
                .is_some_and(|completed| completed < cutoff);
            !(job.status.is_terminal() && finished_before_cutoff)
        });
        Ok(before - tables.jobs.len())
    }
}
