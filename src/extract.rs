//! PDF text extraction with a primary/fallback strategy chain.
//!
//! The primary strategy runs `pdf-extract` over the whole file. When it errors or yields
//! only whitespace, a second pass walks the page tree with `lopdf` and collects per-page
//! text. Only when both strategies produce no text does extraction report a typed failure,
//! so callers can tell a broken file apart from a genuinely empty one. The file is read
//! into memory up front and the handle released before any downstream work starts.

use std::path::Path;
use thiserror::Error;

/// Errors raised while extracting text from an uploaded document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file could not be read from disk.
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
    /// Both extraction strategies ran and neither produced text.
    #[error("No extractable text: primary ({primary}), fallback ({fallback})")]
    NoText {
        /// Outcome of the primary `pdf-extract` pass.
        primary: String,
        /// Outcome of the fallback `lopdf` pass.
        fallback: String,
    },
}

/// Interface for turning a document file into plain text.
pub trait TextExtractor: Send + Sync {
    /// Extract raw text from the file at `path`.
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Extractor for PDF files backed by `pdf-extract` with a `lopdf` fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Construct a new extractor instance.
    pub const fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let bytes = std::fs::read(path)?;
        extract_from_bytes(&bytes)
    }
}

/// Run the strategy chain over in-memory PDF bytes.
pub fn extract_from_bytes(bytes: &[u8]) -> Result<String, ExtractionError> {
    let primary = match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::debug!(chars = text.len(), "Primary extraction succeeded");
            return Ok(text.trim().to_string());
        }
        Ok(_) => "empty output".to_string(),
        Err(error) => error.to_string(),
    };

    tracing::debug!(primary = %primary, "Primary extraction yielded no text; trying fallback");

    let fallback = match extract_with_lopdf(bytes) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::debug!(chars = text.len(), "Fallback extraction succeeded");
            return Ok(text.trim().to_string());
        }
        Ok(_) => "empty output".to_string(),
        Err(error) => error.to_string(),
    };

    Err(ExtractionError::NoText { primary, fallback })
}

fn extract_with_lopdf(bytes: &[u8]) -> Result<String, lopdf::Error> {
    let document = lopdf::Document::load_mem(bytes)?;
    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        if let Ok(page_text) = document.extract_text(&[*page_number]) {
            text.push_str(&page_text);
            text.push('\n');
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_both_strategies() {
        let error = extract_from_bytes(b"not a pdf at all").expect_err("extraction failure");
        match error {
            ExtractionError::NoText { primary, fallback } => {
                assert!(!primary.is_empty());
                assert!(!fallback.is_empty());
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn missing_file_reports_io_error() {
        let extractor = PdfExtractor::new();
        let error = extractor
            .extract(Path::new("/nonexistent/document.pdf"))
            .expect_err("io failure");
        assert!(matches!(error, ExtractionError::Io(_)));
    }

    #[test]
    fn valid_pdf_yields_trimmed_text() {
        let pdf = crate::test_support::pdf_fixture("Certificate of Completion awarded to Jane Doe");
        let text = extract_from_bytes(&pdf).expect("extractable text");
        assert!(text.contains("Certificate of Completion"));
        assert_eq!(text, text.trim());
    }
}
