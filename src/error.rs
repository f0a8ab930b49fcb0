//! Error types for the cv-analyzer library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AnalyzerError`] is **fatal**: the analyzer cannot be used at all
//!   (no API credential, invalid configuration, HTTP client could not be
//!   built) or a caller-side pre-flight check on a CV file failed. Returned as
//!   `Err(AnalyzerError)` from constructors and [`crate::CvDocument`] helpers.
//!
//! * [`PipelineError`] is **non-fatal**: one stage of one analysis failed
//!   (pdfium missing, unreadable PDF, service returned 503). These never
//!   reach the caller as `Err`; the orchestrator absorbs them into the
//!   returned [`crate::AnalysisResult`], either by falling back to the next
//!   stage or by producing a zero-score message.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors returned by the cv-analyzer library.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The API credential environment variable is absent or empty.
    #[error("API credential is not configured.\nSet the {var} environment variable.")]
    MissingCredential { var: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The outbound HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── Document pre-flight errors ────────────────────────────────────────
    /// CV file was not found at the given path.
    #[error("CV file not found: '{path}'")]
    DocumentNotFound { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("CV file is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// Reading or spilling the CV failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for one stage of one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// pdfium could not be bound, the PDF could not be opened, or no page
    /// could be rendered/encoded.
    #[error("CV rendering unavailable: {detail}")]
    RenderingUnavailable { detail: String },

    /// No text could be extracted from the CV.
    #[error("CV text extraction failed: {detail}")]
    ExtractionFailed { detail: String },

    /// The completion service answered with a non-2xx status, or the request
    /// never got an answer.
    #[error("{}", service_failure_message(*status, detail))]
    ServiceCallFailed { status: Option<u16>, detail: String },

    /// The completion service did not answer within the configured timeout.
    #[error("Completion service timed out after {secs}s")]
    ServiceTimeout { secs: u64 },

    /// The service answered 2xx but carried no completion text.
    #[error("Completion service returned no content")]
    EmptyCompletion,
}

impl PipelineError {
    /// True for failures of the outbound completion call.
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::ServiceCallFailed { .. }
                | PipelineError::ServiceTimeout { .. }
                | PipelineError::EmptyCompletion
        )
    }
}

fn service_failure_message(status: Option<u16>, detail: &str) -> String {
    match status {
        Some(code) => format!("Completion service returned HTTP {code}: {detail}"),
        None => format!("Completion service request failed: {detail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_names_variable() {
        let e = AnalyzerError::MissingCredential {
            var: "OPENAI_API_KEY".into(),
        };
        assert!(e.to_string().contains("OPENAI_API_KEY"), "got: {e}");
    }

    #[test]
    fn service_failure_display_with_status() {
        let e = PipelineError::ServiceCallFailed {
            status: Some(503),
            detail: "overloaded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("HTTP 503"), "got: {msg}");
        assert!(msg.contains("overloaded"));
    }

    #[test]
    fn service_failure_display_without_status() {
        let e = PipelineError::ServiceCallFailed {
            status: None,
            detail: "connection refused".into(),
        };
        assert!(e.to_string().contains("request failed"));
    }

    #[test]
    fn classifies_service_failures() {
        assert!(PipelineError::ServiceTimeout { secs: 60 }.is_service_failure());
        assert!(PipelineError::EmptyCompletion.is_service_failure());
        assert!(!PipelineError::ExtractionFailed {
            detail: "empty".into()
        }
        .is_service_failure());
        assert!(!PipelineError::RenderingUnavailable {
            detail: "no pdfium".into()
        }
        .is_service_failure());
    }
}
