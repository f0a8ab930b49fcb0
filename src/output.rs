//! Result types returned by the analyzer.

use crate::pipeline::response::ScoreStatus;
use serde::{Deserialize, Serialize};

/// Message returned when neither rendering nor text extraction could read the CV.
pub const UNREADABLE_CV_MESSAGE: &str =
    "Unable to analyse the CV. Please check the file format.";

/// Which branch of the fallback chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPath {
    /// Page images scored by the vision profile.
    Vision,
    /// The CV did not render; extracted text scored by the text profile.
    Text,
    /// The vision call failed; extracted text scored by the text profile.
    TextFallback,
    /// Rendering and extraction both failed.
    Unreadable,
    /// The text-profile call failed.
    ServiceFailed,
}

/// Outcome of one CV analysis.
///
/// Always produced, whatever failed along the way; `path` and
/// `score_status` say how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Free-text analysis, typographic quotes normalised to ASCII.
    pub analysis: String,
    /// Fit score in 0–100; 0 whenever no score could be determined.
    pub score: f64,
    pub path: AnalysisPath,
    pub score_status: ScoreStatus,
    /// Why the vision branch was abandoned, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub duration_ms: u64,
}

impl AnalysisResult {
    /// The `(analysis, score)` pair the calling application stores.
    pub fn into_pair(self) -> (String, f64) {
        (self.analysis, self.score)
    }

    /// True when the score came from a model answer rather than a default.
    pub fn is_scored(&self) -> bool {
        self.score_status == ScoreStatus::Parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            analysis: "Good fit".into(),
            score: 81.0,
            path: AnalysisPath::TextFallback,
            score_status: ScoreStatus::Parsed,
            fallback_reason: Some("HTTP 503".into()),
            duration_ms: 1200,
        }
    }

    #[test]
    fn into_pair_keeps_text_and_score() {
        assert_eq!(sample().into_pair(), ("Good fit".to_string(), 81.0));
    }

    #[test]
    fn serialises_path_in_snake_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["path"], "text_fallback");
        assert_eq!(json["score_status"], "parsed");
        assert_eq!(json["fallback_reason"], "HTTP 503");
    }

    #[test]
    fn omits_absent_fallback_reason() {
        let mut r = sample();
        r.fallback_reason = None;
        let json = serde_json::to_value(r).unwrap();
        assert!(json.get("fallback_reason").is_none());
    }
}
