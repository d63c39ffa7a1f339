use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_analyzed: AtomicU64,
    documents_failed: AtomicU64,
    clauses_persisted: AtomicU64,
    clause_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed document with its persisted and failed clause counts.
    pub fn record_analyzed(&self, persisted: u64, failed: u64) {
        self.documents_analyzed.fetch_add(1, Ordering::Relaxed);
        self.clauses_persisted.fetch_add(persisted, Ordering::Relaxed);
        self.clause_failures.fetch_add(failed, Ordering::Relaxed);
    }

    /// Record a document-level failure.
    pub fn record_failed(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_analyzed: self.documents_analyzed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            clauses_persisted: self.clauses_persisted.load(Ordering::Relaxed),
            clause_failures: self.clause_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents that reached the analyzed status since startup.
    pub documents_analyzed: u64,
    /// Documents that failed at a document-level stage since startup.
    pub documents_failed: u64,
    /// Total clauses persisted across all analyzed documents.
    pub clauses_persisted: u64,
    /// Per-clause failures that were skipped without failing a document.
    pub clause_failures: u64,
}
