//! Document analysis orchestration.

pub mod service;
pub mod types;

pub use service::{AnalysisHandler, AnalysisService, submit_document};
pub use types::{
    AnalysisJobPayload, AnalysisOutcome, ClauseProcessingError, PipelineError, SubmitError,
    SubmitReceipt,
};
