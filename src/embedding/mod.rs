//! Embedding generation and similarity search.
//!
//! The embedding model is a process-wide singleton: lazily initialized on
//! first use inside the [`EmbeddingGenerator`], shared by every job running in
//! the worker, never re-initialized per call. A semaphore bounds concurrent
//! model invocations to cap peak memory use. Batched requests are processed
//! sequentially in fixed-size batches for the same reason, not for
//! correctness.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OnceCell, Semaphore};

use crate::config::Config;

/// Dimensionality of clause embeddings.
pub const EMBEDDING_DIMENSION: usize = 384;
/// Hard cap on input length; longer texts are truncated before embedding.
pub const MAX_EMBEDDING_INPUT_CHARS: usize = 2000;
/// Fixed batch size for batched embedding requests.
pub const EMBEDDING_BATCH_SIZE: usize = 10;

/// Errors raised while generating or comparing embeddings.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Model was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    Generation(String),
    /// Two vectors of differing length were compared.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Length of the first vector.
        expected: usize,
        /// Length of the second vector.
        actual: usize,
    },
    /// A stored textual vector could not be parsed back.
    #[error("Invalid stored vector: {0}")]
    InvalidStorage(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Dimensionality of the vectors this model produces.
    fn dimension(&self) -> usize;

    /// Produce one embedding vector per supplied text.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Deterministic in-process embedding model.
///
/// Hashes byte content into vector slots and L2-normalizes the result. Not a
/// semantic model, but cheap, deterministic, and shaped exactly like one —
/// sufficient for similarity plumbing and tests.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Construct an embedder producing vectors of `dimension` slots.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % self.dimension;
            // Basic hashing of content into the vector slot
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingModel for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}

/// Lazily-initialized embedding front end shared by all jobs in a worker.
pub struct EmbeddingGenerator {
    model: OnceCell<Arc<dyn EmbeddingModel>>,
    permits: Arc<Semaphore>,
    dimension: usize,
}

impl EmbeddingGenerator {
    /// Build a generator whose model loads lazily on first use.
    pub fn new(config: &Config) -> Self {
        Self {
            model: OnceCell::new(),
            permits: Arc::new(Semaphore::new(config.embedding_concurrency.max(1))),
            dimension: config.embedding_dimension.max(1),
        }
    }

    /// Build a generator around an already-loaded model (used by tests and
    /// alternative backends).
    pub fn with_model(model: Arc<dyn EmbeddingModel>, concurrency: usize) -> Self {
        let dimension = model.dimension();
        Self {
            model: OnceCell::new_with(Some(model)),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            dimension,
        }
    }

    async fn model(&self) -> Arc<dyn EmbeddingModel> {
        self.model
            .get_or_init(|| async {
                tracing::info!(dimension = self.dimension, "Loading embedding model");
                Arc::new(HashEmbedder::new(self.dimension)) as Arc<dyn EmbeddingModel>
            })
            .await
            .clone()
    }

    /// Embed a single text, truncating it to the input cap first.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = [text.to_string()];
        let mut vectors = self.embed_batch(&input).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Generation("model returned no vectors".to_string()))
    }

    /// Embed many texts in sequential fixed-size batches.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model().await;
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
            let truncated: Vec<String> = batch.iter().map(|text| truncate_input(text)).collect();
            let permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| EmbeddingError::Generation("embedding limiter closed".to_string()))?;
            let batch_vectors = model.embed(&truncated).await?;
            drop(permit);
            if batch_vectors.len() != truncated.len() {
                return Err(EmbeddingError::Generation(format!(
                    "model returned {} vectors for {} inputs",
                    batch_vectors.len(),
                    truncated.len()
                )));
            }
            vectors.extend(batch_vectors);
        }
        Ok(vectors)
    }
}

/// Truncate text to the embedding input cap on a char boundary.
pub fn truncate_input(text: &str) -> String {
    match text.char_indices().nth(MAX_EMBEDDING_INPUT_CHARS) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Cosine similarity between two equal-length vectors.
///
/// Returns `0.0` when either vector has zero magnitude rather than dividing
/// by zero; fails when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// One nearest-neighbor search result.
#[derive(Clone, Copy, Debug)]
pub struct SimilarityHit {
    /// Index into the candidate slice.
    pub index: usize,
    /// Cosine similarity against the query.
    pub score: f32,
}

/// Top-K nearest neighbors of `query` among `candidates`.
///
/// Ordered by descending similarity with stable tie-break by original
/// candidate order.
pub fn top_k(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
) -> Result<Vec<SimilarityHit>, EmbeddingError> {
    let mut hits = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            cosine_similarity(query, candidate).map(|score| SimilarityHit { index, score })
        })
        .collect::<Result<Vec<_>, _>>()?;

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    hits.truncate(k);
    Ok(hits)
}

/// Encode a vector into its textual storage form: bracketed, comma-separated.
pub fn encode_vector(vector: &[f32]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(vector.len() * 12 + 2);
    out.push('[');
    for (idx, value) in vector.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        // f32 Display emits the shortest representation that round-trips.
        let _ = write!(out, "{value}");
    }
    out.push(']');
    out
}

/// Parse a vector from its textual storage form.
pub fn parse_vector(text: &str) -> Result<Vec<f32>, EmbeddingError> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| EmbeddingError::InvalidStorage("missing brackets".to_string()))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            part.trim().parse::<f32>().map_err(|err| {
                EmbeddingError::InvalidStorage(format!("bad float '{}': {err}", part.trim()))
            })
        })
        .collect()
}
