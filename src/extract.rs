//! Text-extraction collaborator boundary.
//!
//! The pipeline consumes plain extracted text and metadata; pulling text out
//! of binary formats is someone else's job. [`PlainTextExtractor`] covers the
//! plain-text family and fails fast for anything it cannot read, which is the
//! document-level failure path the orchestrator propagates.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::classification::entities::EntityExtractor;
use crate::model::ExtractionMetadata;

/// Rough characters-per-page estimate for plain text.
const CHARS_PER_PAGE: usize = 1800;

/// Errors raised while extracting text from a source file.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The declared file type is not supported by this extractor.
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    /// The source file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that failed to open or read.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}

/// Extracted text plus the metadata observed along the way.
#[derive(Clone, Debug)]
pub struct Extraction {
    /// Plain text content of the document.
    pub text: String,
    /// Page count, detected type, and detected parties/dates.
    pub metadata: ExtractionMetadata,
}

/// Interface implemented by extraction backends.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text and metadata from `path`, which the caller declared to be
    /// of `declared_type`.
    async fn extract(&self, path: &Path, declared_type: &str)
    -> Result<Extraction, ExtractionError>;
}

/// Extractor for plain-text sources (`txt`, `text`, `md`, `markdown`).
pub struct PlainTextExtractor {
    entities: EntityExtractor,
}

impl PlainTextExtractor {
    /// Construct a plain-text extractor.
    pub fn new() -> Self {
        Self {
            entities: EntityExtractor::new(),
        }
    }

    fn describe(&self, text: &str) -> ExtractionMetadata {
        let page_count = text.chars().count().div_ceil(CHARS_PER_PAGE).max(1);
        let entities = self.entities.extract(text);
        ExtractionMetadata {
            page_count,
            document_type: detect_document_type(text),
            parties: entities.organizations,
            dates: entities.dates,
        }
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(
        &self,
        path: &Path,
        declared_type: &str,
    ) -> Result<Extraction, ExtractionError> {
        let normalized = declared_type.trim().trim_start_matches('.').to_lowercase();
        match normalized.as_str() {
            "txt" | "text" | "md" | "markdown" => {}
            other => return Err(ExtractionError::UnsupportedType(other.to_string())),
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ExtractionError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), chars = text.len(), "Extracted plain text");
        let metadata = self.describe(&text);
        Ok(Extraction { text, metadata })
    }
}

/// Detect a coarse document category from characteristic vocabulary.
fn detect_document_type(text: &str) -> Option<String> {
    const TYPES: &[(&str, &str)] = &[
        ("non-disclosure", "nda"),
        ("confidentiality agreement", "nda"),
        ("employment agreement", "employment_agreement"),
        ("lease", "lease"),
        ("services agreement", "service_agreement"),
        ("service agreement", "service_agreement"),
        ("license agreement", "license_agreement"),
        ("purchase agreement", "purchase_agreement"),
    ];

    let lowered = text.to_lowercase();
    TYPES
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, label)| (*label).to_string())
        .or_else(|| lowered.contains("agreement").then(|| "contract".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn extracts_text_and_metadata_from_plain_files() {
        let file = write_temp(
            "SERVICES AGREEMENT between Acme Widgets Inc. and Globex Corporation, effective 01/15/2024.",
        );
        let extractor = PlainTextExtractor::new();
        let extraction = extractor.extract(file.path(), "txt").await.unwrap();
        assert!(extraction.text.starts_with("SERVICES AGREEMENT"));
        assert_eq!(extraction.metadata.page_count, 1);
        assert_eq!(extraction.metadata.document_type.as_deref(), Some("service_agreement"));
        assert_eq!(extraction.metadata.parties.len(), 2);
        assert_eq!(extraction.metadata.dates, vec!["01/15/2024"]);
    }

    #[tokio::test]
    async fn unsupported_types_fail_before_touching_the_filesystem() {
        let extractor = PlainTextExtractor::new();
        let error = extractor
            .extract(Path::new("/nonexistent/contract.pdf"), "pdf")
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::UnsupportedType(kind) if kind == "pdf"));
    }

    #[tokio::test]
    async fn missing_files_surface_io_errors() {
        let extractor = PlainTextExtractor::new();
        let error = extractor
            .extract(Path::new("/nonexistent/contract.txt"), "txt")
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::Io { .. }));
    }

    #[tokio::test]
    async fn page_count_scales_with_length() {
        let file = write_temp(&"a".repeat(CHARS_PER_PAGE * 2 + 1));
        let extractor = PlainTextExtractor::new();
        let extraction = extractor.extract(file.path(), "md").await.unwrap();
        assert_eq!(extraction.metadata.page_count, 3);
    }
}
