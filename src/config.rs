use serde::Deserialize;
use std::env;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for a clauselens worker process.
///
/// Constructed once at startup and passed by `Arc` into the services that need
/// it; nothing in the crate reads the environment after this point. Every
/// variable is optional — the defaults describe a small single-host worker.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Number of queue worker tasks pulling jobs.
    pub worker_count: usize,
    /// Bounded capacity of the job queue.
    pub queue_capacity: usize,
    /// Maximum clauses analyzed concurrently within one document.
    pub clause_concurrency: usize,
    /// Maximum concurrent embedding-model invocations per process.
    pub embedding_concurrency: usize,
    /// Maximum queue-level attempts per job, including the first.
    pub job_max_attempts: u32,
    /// Base delay in milliseconds for exponential retry backoff.
    pub retry_base_delay_ms: u64,
    /// Days a terminal job record is retained before the sweep purges it.
    pub job_retention_days: i64,
    /// Seconds between runs of the terminal-job sweep.
    pub sweep_interval_secs: u64,
    /// Dimensionality of clause embeddings.
    pub embedding_dimension: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: 2,
            queue_capacity: 64,
            clause_concurrency: 4,
            embedding_concurrency: 2,
            job_max_attempts: 3,
            retry_base_delay_ms: 500,
            job_retention_days: 7,
            sweep_interval_secs: 3600,
            embedding_dimension: 384,
        }
    }
}

impl Config {
    /// Load configuration from `CLAUSELENS_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            worker_count: load_env_parsed("CLAUSELENS_WORKER_COUNT")?
                .unwrap_or(defaults.worker_count),
            queue_capacity: load_env_parsed("CLAUSELENS_QUEUE_CAPACITY")?
                .unwrap_or(defaults.queue_capacity),
            clause_concurrency: load_env_parsed("CLAUSELENS_CLAUSE_CONCURRENCY")?
                .unwrap_or(defaults.clause_concurrency),
            embedding_concurrency: load_env_parsed("CLAUSELENS_EMBEDDING_CONCURRENCY")?
                .unwrap_or(defaults.embedding_concurrency),
            job_max_attempts: load_env_parsed("CLAUSELENS_JOB_MAX_ATTEMPTS")?
                .unwrap_or(defaults.job_max_attempts),
            retry_base_delay_ms: load_env_parsed("CLAUSELENS_RETRY_BASE_DELAY_MS")?
                .unwrap_or(defaults.retry_base_delay_ms),
            job_retention_days: load_env_parsed("CLAUSELENS_JOB_RETENTION_DAYS")?
                .unwrap_or(defaults.job_retention_days),
            sweep_interval_secs: load_env_parsed("CLAUSELENS_SWEEP_INTERVAL_SECS")?
                .unwrap_or(defaults.sweep_interval_secs),
            embedding_dimension: load_env_parsed("CLAUSELENS_EMBEDDING_DIMENSION")?
                .unwrap_or(defaults.embedding_dimension),
        })
    }
}

fn load_env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key).ok().filter(|value| !value.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(None),
    }
}
