//! The document analysis pipeline and its queue handler.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::classification::title::extract_title;
use crate::classification::ClauseClassifier;
use crate::config::Config;
use crate::embedding::EmbeddingGenerator;
use crate::extract::TextExtractor;
use crate::metrics::PipelineMetrics;
use crate::model::{
    Clause, Document, DocumentStatus, JobStatus, JobSummary, JobType, ProcessingJob,
};
use crate::pipeline::types::{
    AnalysisJobPayload, AnalysisOutcome, ClauseProcessingError, PipelineError, SubmitError,
    SubmitReceipt,
};
use crate::queue::{EnqueueOptions, JobContext, JobHandler, JobQueue};
use crate::risk::RiskScorer;
use crate::segmentation::{self, ClauseCandidate};
use crate::store::Store;

/// Orchestrates one document through extraction, segmentation, per-clause
/// analysis, and persistence.
///
/// Clause analysis within a document runs concurrently up to the configured
/// limit, and results are persisted in position order regardless of completion
/// order. A clause failure skips that clause and continues; only extraction,
/// segmentation, and non-clause store failures fail the document.
pub struct AnalysisService {
    config: Arc<Config>,
    store: Arc<dyn Store>,
    extractor: Arc<dyn TextExtractor>,
    classifier: ClauseClassifier,
    scorer: RiskScorer,
    embeddings: EmbeddingGenerator,
    metrics: Arc<PipelineMetrics>,
}

impl AnalysisService {
    /// Build a service with the default lazily-loaded embedding model.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn Store>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let embeddings = EmbeddingGenerator::new(&config);
        Self::with_embedding_generator(config, store, extractor, embeddings)
    }

    /// Build a service around a specific embedding generator.
    pub fn with_embedding_generator(
        config: Arc<Config>,
        store: Arc<dyn Store>,
        extractor: Arc<dyn TextExtractor>,
        embeddings: EmbeddingGenerator,
    ) -> Self {
        Self {
            config,
            store,
            extractor,
            classifier: ClauseClassifier::new(),
            scorer: RiskScorer::new(),
            embeddings,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Pipeline metrics counters.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        self.metrics.clone()
    }

    /// Run the full pipeline for one job payload.
    ///
    /// On success the document is `Analyzed` and the job record is completed
    /// with a summary. On error nothing terminal has been recorded; the caller
    /// decides whether to retry or to call [`Self::record_failure`].
    pub async fn run(&self, payload: &AnalysisJobPayload) -> Result<AnalysisOutcome, PipelineError> {
        self.claim(payload).await?;

        let extraction = self
            .extractor
            .extract(&payload.file_path, &payload.file_type)
            .await?;
        let text = extraction.text;
        let page_count = extraction.metadata.page_count;
        self.store
            .set_extracted(payload.document_id, text.clone(), extraction.metadata)
            .await?;

        // Re-analysis replaces the clause set wholesale.
        let stale = self.store.clear_clauses(payload.document_id).await?;
        if stale > 0 {
            tracing::debug!(
                document_id = %payload.document_id,
                stale,
                "Dropped clauses from a previous run"
            );
        }

        let candidates = segment_text(&text)?;
        tracing::info!(
            document_id = %payload.document_id,
            clause_count = candidates.len(),
            "Segmented document"
        );

        let results: Vec<Result<Clause, ClauseProcessingError>> =
            futures_util::stream::iter(candidates)
                .map(|candidate| self.analyze_clause(payload.document_id, candidate))
                .buffered(self.config.clause_concurrency.max(1))
                .collect()
                .await;

        let mut persisted = 0_usize;
        let mut failed = 0_usize;
        for result in results {
            let clause = match result {
                Ok(clause) => clause,
                Err(error) => {
                    failed += 1;
                    tracing::warn!(
                        document_id = %payload.document_id,
                        position = error.position(),
                        error = %error,
                        "Skipping clause"
                    );
                    continue;
                }
            };
            let position = clause.position;
            match self.store.insert_clause(clause).await {
                Ok(()) => persisted += 1,
                Err(source) => {
                    let error = ClauseProcessingError::Persist { position, source };
                    failed += 1;
                    tracing::warn!(
                        document_id = %payload.document_id,
                        position,
                        error = %error,
                        "Skipping clause"
                    );
                }
            }
        }

        let outcome = AnalysisOutcome {
            clause_count: persisted,
            failed_clauses: failed,
            text_length: text.chars().count(),
            page_count,
            word_count: text.split_whitespace().count(),
        };
        self.complete(payload, outcome).await?;
        self.metrics.record_analyzed(persisted as u64, failed as u64);
        tracing::info!(
            document_id = %payload.document_id,
            job_id = %payload.job_id,
            clauses = persisted,
            skipped = failed,
            "Document analyzed"
        );
        Ok(outcome)
    }

    /// Analyze a single segmented candidate into a persistable clause.
    async fn analyze_clause(
        &self,
        document_id: Uuid,
        candidate: ClauseCandidate,
    ) -> Result<Clause, ClauseProcessingError> {
        let classification = self.classifier.classify(&candidate.text);
        let risk = self.scorer.score(&candidate.text);
        let title = extract_title(&candidate.text);
        let embedding = self
            .embeddings
            .embed_text(&candidate.text)
            .await
            .map_err(|source| ClauseProcessingError::Embedding {
                position: candidate.position,
                source,
            })?;

        Ok(Clause {
            id: Uuid::new_v4(),
            document_id,
            position: candidate.position,
            section_number: candidate.section_number,
            title,
            word_count: candidate.text.split_whitespace().count(),
            clause_type: classification.clause_type,
            confidence: classification.confidence,
            entities: classification.entities,
            risk_level: risk.level,
            risk_flags: risk.flags,
            requires_review: risk.requires_review,
            embedding,
            text: candidate.text,
        })
    }

    /// Mark the job and its document as processing.
    ///
    /// The document moves to `Processing` before extraction starts so that a
    /// failure at any later stage has a legal path to `Failed`.
    async fn claim(&self, payload: &AnalysisJobPayload) -> Result<(), PipelineError> {
        let mut job = self.store.job(payload.job_id).await?;
        if job.status == JobStatus::Pending {
            job.status = JobStatus::Processing;
            job.started_at = Some(OffsetDateTime::now_utc());
            self.store.update_job(job).await?;
        }
        self.store
            .update_document_status(payload.document_id, DocumentStatus::Processing)
            .await?;
        Ok(())
    }

    /// Record the terminal success state for the document and its job.
    async fn complete(
        &self,
        payload: &AnalysisJobPayload,
        outcome: AnalysisOutcome,
    ) -> Result<(), PipelineError> {
        self.store
            .update_document_status(payload.document_id, DocumentStatus::Analyzed)
            .await?;
        let mut job = self.store.job(payload.job_id).await?;
        job.status = JobStatus::Completed;
        job.completed_at = Some(OffsetDateTime::now_utc());
        job.summary = Some(JobSummary {
            text_length: outcome.text_length,
            page_count: outcome.page_count,
            word_count: outcome.word_count,
            clause_count: outcome.clause_count,
        });
        self.store.update_job(job).await?;
        Ok(())
    }

    /// Record the terminal failure state after the last retry is spent.
    ///
    /// Best effort: bookkeeping failures are logged, not propagated, because
    /// there is no further retry to hand them to.
    pub async fn record_failure(&self, payload: &AnalysisJobPayload, error: &PipelineError) {
        self.metrics.record_failed();
        if let Err(store_error) = self
            .store
            .update_document_status(payload.document_id, DocumentStatus::Failed)
            .await
        {
            tracing::error!(
                document_id = %payload.document_id,
                error = %store_error,
                "Could not mark document failed"
            );
        }
        match self.store.job(payload.job_id).await {
            Ok(mut job) => {
                job.status = JobStatus::Failed;
                job.completed_at = Some(OffsetDateTime::now_utc());
                job.error = Some(error.to_string());
                if let Err(store_error) = self.store.update_job(job).await {
                    tracing::error!(
                        job_id = %payload.job_id,
                        error = %store_error,
                        "Could not mark job failed"
                    );
                }
            }
            Err(store_error) => {
                tracing::error!(
                    job_id = %payload.job_id,
                    error = %store_error,
                    "Could not load job to mark it failed"
                );
            }
        }
    }
}

/// Run segmentation, converting a panic in the segmenter into a
/// document-level error instead of taking down the worker.
fn segment_text(text: &str) -> Result<Vec<ClauseCandidate>, PipelineError> {
    std::panic::catch_unwind(AssertUnwindSafe(|| segmentation::segment(text))).map_err(|panic| {
        let detail = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "segmentation panicked".to_string());
        PipelineError::Segmentation(detail)
    })
}

/// Queue handler driving [`AnalysisService`] and owning the retry-vs-terminal
/// decision: intermediate failures are handed back to the queue, and terminal
/// bookkeeping happens only once the attempt budget is spent.
pub struct AnalysisHandler {
    service: Arc<AnalysisService>,
}

impl AnalysisHandler {
    /// Wrap a service for queue consumption.
    pub fn new(service: Arc<AnalysisService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl JobHandler for AnalysisHandler {
    async fn execute(&self, ctx: JobContext) -> anyhow::Result<()> {
        let payload: AnalysisJobPayload = serde_json::from_value(ctx.payload.clone())?;
        tracing::info!(
            document_id = %payload.document_id,
            job_id = %payload.job_id,
            attempt = ctx.attempt,
            "Starting document analysis"
        );
        match self.service.run(&payload).await {
            Ok(_) => Ok(()),
            Err(error) => {
                if ctx.is_final_attempt() {
                    self.service.record_failure(&payload, &error).await;
                }
                Err(error.into())
            }
        }
    }
}

/// Register a new document and enqueue its analysis job.
pub async fn submit_document(
    store: &dyn Store,
    queue: &JobQueue,
    user_id: Uuid,
    file_path: PathBuf,
    file_type: &str,
    options: EnqueueOptions,
) -> Result<SubmitReceipt, SubmitError> {
    let document = Document::new(user_id);
    let document_id = document.id;
    store.create_document(document).await?;

    let job = ProcessingJob::new(document_id, JobType::Extraction);
    let job_id = job.id;
    store.create_job(job).await?;

    let payload = AnalysisJobPayload {
        document_id,
        file_path,
        file_type: file_type.to_string(),
        user_id,
        job_id,
    };
    queue.enqueue(&payload, options).await?;
    tracing::info!(%document_id, %job_id, "Document submitted for analysis");
    Ok(SubmitReceipt {
        document_id,
        job_id,
    })
}
