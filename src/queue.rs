//! Work queue, bounded retries, and the job retention sweep.
//!
//! A bounded channel feeds a pool of worker tasks; each job runs to completion
//! on the worker that claimed it, with no mid-job cancellation. Document-level
//! failures are retried in place by the worker, up to the enqueue-time attempt
//! budget with exponential backoff. Handlers see the attempt number and can
//! reserve terminal bookkeeping for the final attempt.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::Config;
use crate::store::Store;

/// Errors raised while interacting with the queue itself, distinct from
/// job-level failure.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue has shut down and accepts no further jobs.
    #[error("Queue is closed")]
    Closed,
    /// The payload could not be serialized into the job envelope.
    #[error("Failed to serialize job payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Per-job retry budget supplied at enqueue time.
#[derive(Clone, Copy, Debug)]
pub struct EnqueueOptions {
    /// Maximum attempts, including the first. Clamped to at least one.
    pub attempts: u32,
    /// Base backoff delay; doubled after each failed attempt.
    pub backoff: Duration,
}

impl EnqueueOptions {
    /// Derive the retry budget from worker configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.job_max_attempts.max(1),
            backoff: Duration::from_millis(config.retry_base_delay_ms),
        }
    }
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Execution context handed to a [`JobHandler`] for one attempt.
#[derive(Clone, Debug)]
pub struct JobContext {
    /// Queue envelope identifier (not the domain job id).
    pub envelope_id: Uuid,
    /// Serialized job payload.
    pub payload: serde_json::Value,
    /// One-based attempt number.
    pub attempt: u32,
    /// Total attempt budget for this envelope.
    pub max_attempts: u32,
}

impl JobContext {
    /// Whether a failure of this attempt is permanent.
    pub fn is_final_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Interface implemented by per-job-type handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run one attempt. An `Err` triggers a retry unless the attempt budget is
    /// exhausted.
    async fn execute(&self, ctx: JobContext) -> anyhow::Result<()>;
}

struct Envelope {
    id: Uuid,
    payload: serde_json::Value,
    options: EnqueueOptions,
}

/// Bounded multi-worker job queue.
pub struct JobQueue {
    sender: mpsc::Sender<Envelope>,
    workers: Vec<JoinHandle<()>>,
}

impl JobQueue {
    /// Start `worker_count` workers draining a channel of `capacity` jobs.
    pub fn start(handler: Arc<dyn JobHandler>, worker_count: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let worker_count = worker_count.max(1);
        let workers = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(run_worker(worker_id, receiver.clone(), handler.clone()))
            })
            .collect();
        tracing::info!(worker_count, capacity, "Job queue started");
        Self { sender, workers }
    }

    /// Enqueue a payload with the given retry budget.
    ///
    /// Returns the envelope identifier, or a [`QueueError`] when the payload
    /// cannot be serialized or the queue is closed.
    pub async fn enqueue<T: Serialize>(
        &self,
        payload: &T,
        options: EnqueueOptions,
    ) -> Result<Uuid, QueueError> {
        let envelope = Envelope {
            id: Uuid::new_v4(),
            payload: serde_json::to_value(payload)?,
            options,
        };
        let id = envelope.id;
        self.sender
            .send(envelope)
            .await
            .map_err(|_| QueueError::Closed)?;
        tracing::debug!(envelope_id = %id, "Job enqueued");
        Ok(id)
    }

    /// Stop accepting jobs and wait for the workers to drain the channel.
    pub async fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            if let Err(error) = worker.await {
                tracing::error!(error = %error, "Queue worker panicked");
            }
        }
        tracing::info!("Job queue drained");
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Envelope>>>,
    handler: Arc<dyn JobHandler>,
) {
    tracing::debug!(worker_id, "Queue worker started");
    loop {
        let envelope = {
            let mut guard = receiver.lock().await;
            guard.recv().await
        };
        let Some(envelope) = envelope else {
            tracing::debug!(worker_id, "Job channel closed");
            break;
        };
        run_job(worker_id, envelope, handler.as_ref()).await;
    }
}

async fn run_job(worker_id: usize, envelope: Envelope, handler: &dyn JobHandler) {
    let max_attempts = envelope.options.attempts.max(1);
    let mut attempt = 1;
    loop {
        let ctx = JobContext {
            envelope_id: envelope.id,
            payload: envelope.payload.clone(),
            attempt,
            max_attempts,
        };
        match handler.execute(ctx).await {
            Ok(()) => {
                tracing::debug!(worker_id, envelope_id = %envelope.id, attempt, "Job finished");
                return;
            }
            Err(error) if attempt < max_attempts => {
                let factor = 1_u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                let delay = envelope.options.backoff.saturating_mul(factor);
                tracing::warn!(
                    worker_id,
                    envelope_id = %envelope.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Job attempt failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                tracing::error!(
                    worker_id,
                    envelope_id = %envelope.id,
                    attempt,
                    error = %error,
                    "Job failed permanently"
                );
                return;
            }
        }
    }
}

/// Spawn the periodic sweep purging terminal jobs older than `retention`.
///
/// Document and clause retention are unaffected; only job records age out.
pub fn spawn_job_sweeper(
    store: Arc<dyn Store>,
    retention: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so a restart loop does not
        // hammer the store.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let cutoff = OffsetDateTime::now_utc() - retention;
            match store.purge_terminal_jobs_before(cutoff).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Purged expired job records"),
                Err(error) => tracing::warn!(error = %error, "Job sweep failed"),
            }
        }
    })
}
