//! Plain-text extraction, the fallback when page images are unavailable.
//!
//! Uses the pure-Rust `pdf-extract` crate rather than pdfium, so text
//! analysis still works on hosts where the rendering library is missing.
//! `pdf-extract` panics on some malformed inputs; running it on the blocking
//! pool turns such a panic into an ordinary [`PipelineError::ExtractionFailed`].

use crate::error::PipelineError;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Pulls the text layer out of a PDF.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, pdf_path: &Path) -> Result<String, PipelineError>;
}

/// `pdf-extract` backed extractor; concatenates text across all pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, pdf_path: &Path) -> Result<String, PipelineError> {
        let text = pdf_extract::extract_text(pdf_path).map_err(|e| {
            PipelineError::ExtractionFailed {
                detail: format!("'{}': {}", pdf_path.display(), e),
            }
        })?;
        non_empty(text)
    }
}

/// Reject whitespace-only output; a scanned CV with no text layer lands here.
pub fn non_empty(text: String) -> Result<String, PipelineError> {
    if text.trim().is_empty() {
        Err(PipelineError::ExtractionFailed {
            detail: "document has no extractable text".into(),
        })
    } else {
        Ok(text)
    }
}

/// Extract on the blocking pool.
pub async fn extract_text(
    extractor: Arc<dyn TextExtractor>,
    pdf_path: &Path,
) -> Result<String, PipelineError> {
    let path = pdf_path.to_path_buf();

    let text = tokio::task::spawn_blocking(move || extractor.extract(&path))
        .await
        .map_err(|e| PipelineError::ExtractionFailed {
            detail: format!("extraction task panicked: {}", e),
        })??;

    debug!("Extracted {} chars of CV text", text.chars().count());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panicking;

    impl TextExtractor for Panicking {
        fn extract(&self, _pdf_path: &Path) -> Result<String, PipelineError> {
            panic!("unexpected end of stream");
        }
    }

    #[test]
    fn whitespace_only_is_failure() {
        assert!(matches!(
            non_empty(" \n\t ".into()),
            Err(PipelineError::ExtractionFailed { .. })
        ));
        assert_eq!(non_empty("Rust engineer".into()).unwrap(), "Rust engineer");
    }

    #[tokio::test]
    async fn panic_becomes_extraction_failed() {
        let err = extract_text(Arc::new(Panicking), Path::new("cv.pdf"))
            .await
            .unwrap_err();
        match err {
            PipelineError::ExtractionFailed { detail } => assert!(detail.contains("panicked")),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn missing_file_is_extraction_failed() {
        let err = tokio_test::block_on(extract_text(
            Arc::new(PdfTextExtractor),
            Path::new("/no/such/cv.pdf"),
        ))
        .unwrap_err();
        assert!(matches!(err, PipelineError::ExtractionFailed { .. }));
    }

    #[tokio::test]
    async fn garbage_file_is_extraction_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.pdf");
        std::fs::write(&path, b"this is not a pdf at all").unwrap();
        let err = extract_text(Arc::new(PdfTextExtractor), &path).await.unwrap_err();
        assert!(matches!(err, PipelineError::ExtractionFailed { .. }));
    }
}
