//! Document text extraction abstraction.
//!
//! PDF parsing is an external collaborator: the pipeline only needs a trait
//! that turns uploaded bytes into plain text. The default implementation
//! handles UTF-8 text content; a PDF-capable extractor can be plugged in at
//! server construction without touching the pipeline.

use crate::error::{PodkastError, Result};

/// Extracts plain text from an uploaded document.
pub trait TextExtractor: Send + Sync {
    /// Extract text from raw file bytes.
    ///
    /// Fails with `InvalidInput` if the content yields no usable text.
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String>;
}

/// Extractor for UTF-8 text content.
///
/// Used for tests and for documents whose text layer has already been
/// extracted upstream.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim();

        if text.len() < 100 {
            return Err(PodkastError::InvalidInput(format!(
                "Document '{}' contains too little text to process",
                filename
            )));
        }

        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_extraction() {
        let extractor = PlainTextExtractor;
        let content = "a".repeat(200);
        let text = extractor.extract("notes.txt", content.as_bytes()).unwrap();
        assert_eq!(text.len(), 200);
    }

    #[test]
    fn test_too_short_rejected() {
        let extractor = PlainTextExtractor;
        let err = extractor.extract("tiny.txt", b"hello").unwrap_err();
        assert!(err.is_invalid_input());
    }
}
