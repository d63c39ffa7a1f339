#![deny(missing_docs)]

//! Core library for the clauselens contract-analysis worker.

/// Clause type classification, entity extraction, and title derivation.
pub mod classification;
/// Environment-driven configuration management.
pub mod config;
/// Embedding generation and similarity search.
pub mod embedding;
/// Text extraction from source files.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Core data model shared across the pipeline.
pub mod model;
/// Document analysis orchestration.
pub mod pipeline;
/// Bounded job queue with retries and the retention sweep.
pub mod queue;
/// Risk indicator scoring.
pub mod risk;
/// Clause segmentation strategies.
pub mod segmentation;
/// Persistence traits and the in-memory store.
pub mod store;
