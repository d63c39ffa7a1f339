//! End-to-end pipeline tests: submission through analysis to persisted clauses.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use clauselens::config::Config;
use clauselens::embedding::{EmbeddingError, EmbeddingGenerator, EmbeddingModel, HashEmbedder};
use clauselens::extract::PlainTextExtractor;
use clauselens::model::{
    ClauseType, Document, DocumentStatus, JobStatus, JobType, ProcessingJob, RiskLevel,
};
use clauselens::pipeline::{
    AnalysisHandler, AnalysisJobPayload, AnalysisService, submit_document,
};
use clauselens::queue::{EnqueueOptions, JobContext, JobHandler, JobQueue};
use clauselens::store::{InMemoryStore, Store};

const CONTRACT: &str = "\
SERVICES AGREEMENT between Acme Widgets Inc. and Globex Corporation, effective 01/15/2024.

1. CONFIDENTIALITY
Each party shall keep all proprietary information and trade secrets of the other party strictly confidential.

2. TERMINATION
Either party may terminate this agreement at any time without cause upon thirty days written notice.

3. PAYMENT
The client shall pay all fees within thirty days of each invoice; late payment may result in termination.

4. GOVERNING LAW
This agreement shall be governed by the laws of the State of Delaware.
";

fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn service(store: Arc<dyn Store>) -> AnalysisService {
    AnalysisService::new(
        Arc::new(Config::default()),
        store,
        Arc::new(PlainTextExtractor::new()),
    )
}

/// Create the document and job rows a queued payload refers to.
async fn seed_submission(store: &dyn Store, file_path: PathBuf, file_type: &str) -> AnalysisJobPayload {
    let user_id = Uuid::new_v4();
    let document = Document::new(user_id);
    let document_id = document.id;
    store.create_document(document).await.unwrap();
    let job = ProcessingJob::new(document_id, JobType::Extraction);
    let job_id = job.id;
    store.create_job(job).await.unwrap();
    AnalysisJobPayload {
        document_id,
        file_path,
        file_type: file_type.to_string(),
        user_id,
        job_id,
    }
}

#[tokio::test]
async fn analyzes_a_contract_into_ordered_typed_clauses() {
    let file = write_temp(CONTRACT);
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let service = service(store.clone());
    let payload = seed_submission(store.as_ref(), file.path().to_path_buf(), "txt").await;

    let outcome = service.run(&payload).await.unwrap();
    assert_eq!(outcome.clause_count, 5);
    assert_eq!(outcome.failed_clauses, 0);
    assert_eq!(outcome.page_count, 1);

    let document = store.document(payload.document_id).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Analyzed);
    assert!(document.processed_at.is_some());
    let metadata = document.metadata.expect("metadata recorded");
    assert_eq!(metadata.document_type.as_deref(), Some("service_agreement"));

    let clauses = store.clauses(payload.document_id).await.unwrap();
    assert_eq!(clauses.len(), 5);
    let positions: Vec<usize> = clauses.iter().map(|c| c.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);

    // Preamble carries no category signal and falls back to the default.
    assert_eq!(clauses[0].clause_type, ClauseType::General);
    assert!((clauses[0].confidence - 0.5).abs() < f32::EPSILON);
    assert_eq!(clauses[0].section_number, None);

    assert_eq!(clauses[1].clause_type, ClauseType::Confidentiality);
    assert_eq!(clauses[1].section_number.as_deref(), Some("1"));
    assert_eq!(clauses[1].title.as_deref(), Some("CONFIDENTIALITY"));
    assert_eq!(clauses[1].risk_level, RiskLevel::Low);
    assert!(!clauses[1].requires_review);

    let termination = &clauses[2];
    assert_eq!(termination.clause_type, ClauseType::Termination);
    assert_eq!(termination.title.as_deref(), Some("TERMINATION"));
    assert_eq!(termination.risk_level, RiskLevel::Medium);
    assert!(termination.requires_review);
    let flagged: Vec<&str> = termination.risk_flags.iter().map(|f| f.pattern.as_str()).collect();
    assert_eq!(flagged, vec!["at-any-time", "without-cause"]);

    // Payment signal dominates but a termination mention dilutes confidence.
    let payment = &clauses[3];
    assert_eq!(payment.clause_type, ClauseType::Payment);
    assert!((payment.confidence - 0.75).abs() < f32::EPSILON);

    assert_eq!(clauses[4].clause_type, ClauseType::GoverningLaw);

    for clause in &clauses {
        assert_eq!(clause.embedding.len(), 384);
        assert!(clause.word_count > 0);
    }

    let job = store.job(payload.job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    let summary = job.summary.expect("summary recorded");
    assert_eq!(summary.clause_count, 5);
    assert_eq!(summary.page_count, 1);
    assert!(summary.word_count > 0);
}

#[tokio::test]
async fn short_two_clause_document_gets_typed_and_risk_scored() {
    let file = write_temp(
        "1. CONFIDENTIALITY\nThe parties shall keep all proprietary information confidential \
and shall not disclose trade secrets.\n\n2. TERMINATION\nEither party may terminate this \
agreement at any time without cause.",
    );
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let service = service(store.clone());
    let payload = seed_submission(store.as_ref(), file.path().to_path_buf(), "txt").await;

    let outcome = service.run(&payload).await.unwrap();
    assert_eq!(outcome.clause_count, 2);

    let clauses = store.clauses(payload.document_id).await.unwrap();
    assert_eq!(clauses[0].clause_type, ClauseType::Confidentiality);
    assert!(clauses[0].confidence > 0.0);
    assert_eq!(clauses[1].clause_type, ClauseType::Termination);
    assert_eq!(clauses[1].risk_level, RiskLevel::Medium);
    assert!(clauses[1].requires_review);
}

#[tokio::test]
async fn extraction_failure_on_the_last_attempt_fails_document_and_job() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let service = Arc::new(service(store.clone()));
    let payload =
        seed_submission(store.as_ref(), PathBuf::from("/nonexistent/contract.pdf"), "pdf").await;

    let handler = AnalysisHandler::new(service);
    let ctx = JobContext {
        envelope_id: Uuid::new_v4(),
        payload: serde_json::to_value(&payload).unwrap(),
        attempt: 1,
        max_attempts: 1,
    };
    assert!(handler.execute(ctx).await.is_err());

    let document = store.document(payload.document_id).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Failed);
    let job = store.job(payload.job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.expect("error recorded").contains("Unsupported"));
    assert!(store.clauses(payload.document_id).await.unwrap().is_empty());
}

/// Delegates to the hash embedder but refuses texts carrying a marker word.
struct FailingModel {
    inner: HashEmbedder,
}

#[async_trait]
impl EmbeddingModel for FailingModel {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|text| text.contains("poisonpill")) {
            return Err(EmbeddingError::Generation("backend rejected input".to_string()));
        }
        self.inner.embed(texts).await
    }
}

#[tokio::test]
async fn a_clause_failure_skips_that_clause_and_analyzes_the_rest() {
    let mut paragraphs: Vec<String> = (0..10)
        .map(|i| {
            format!("Paragraph number {i} describes delivery obligations and acceptance criteria in detail.")
        })
        .collect();
    paragraphs[4].push_str(" poisonpill");
    let text = paragraphs.join("\n\n");
    let file = write_temp(&text);

    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let embeddings = EmbeddingGenerator::with_model(
        Arc::new(FailingModel {
            inner: HashEmbedder::new(16),
        }),
        2,
    );
    let service = AnalysisService::with_embedding_generator(
        Arc::new(Config::default()),
        store.clone(),
        Arc::new(PlainTextExtractor::new()),
        embeddings,
    );
    let payload = seed_submission(store.as_ref(), file.path().to_path_buf(), "txt").await;

    let outcome = service.run(&payload).await.unwrap();
    assert_eq!(outcome.clause_count, 9);
    assert_eq!(outcome.failed_clauses, 1);

    let document = store.document(payload.document_id).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Analyzed);

    let clauses = store.clauses(payload.document_id).await.unwrap();
    assert_eq!(clauses.len(), 9);
    let positions: Vec<usize> = clauses.iter().map(|c| c.position).collect();
    assert!(!positions.contains(&4));

    let summary = store.job(payload.job_id).await.unwrap().summary.unwrap();
    assert_eq!(summary.clause_count, 9);

    let snapshot = service.metrics().snapshot();
    assert_eq!(snapshot.documents_analyzed, 1);
    assert_eq!(snapshot.clauses_persisted, 9);
    assert_eq!(snapshot.clause_failures, 1);
}

#[tokio::test]
async fn submission_through_the_queue_reaches_a_terminal_job() {
    let file = write_temp(CONTRACT);
    let config = Arc::new(Config::default());
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let service = Arc::new(AnalysisService::new(
        config.clone(),
        store.clone(),
        Arc::new(PlainTextExtractor::new()),
    ));
    let handler = Arc::new(AnalysisHandler::new(service));
    let queue = JobQueue::start(handler, 2, 8);

    let receipt = submit_document(
        store.as_ref(),
        &queue,
        Uuid::new_v4(),
        file.path().to_path_buf(),
        "txt",
        EnqueueOptions::from_config(&config),
    )
    .await
    .unwrap();

    let mut job = store.job(receipt.job_id).await.unwrap();
    for _ in 0..200 {
        if job.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        job = store.job(receipt.job_id).await.unwrap();
    }
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());

    let document = store.document(receipt.document_id).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Analyzed);
    assert_eq!(store.clauses(receipt.document_id).await.unwrap().len(), 5);

    queue.shutdown().await;
}
