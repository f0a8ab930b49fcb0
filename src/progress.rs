//! Progress-callback trait for analysis stage events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to observe
//! which branch of the fallback chain an analysis takes. Callers can forward
//! events to a metrics counter, an audit log, or a terminal progress bar
//! without the library knowing how the host application reports.
//!
//! # Example
//!
//! ```rust
//! use cv_analyzer::{AnalysisConfig, AnalysisProgressCallback, AnalysisStage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FallbackCounter {
//!     fallbacks: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for FallbackCounter {
//!     fn on_fallback(&self, _from: AnalysisStage, reason: &str) {
//!         self.fallbacks.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("fell back: {reason}");
//!     }
//! }
//!
//! let counter = Arc::new(FallbackCounter { fallbacks: AtomicUsize::new(0) });
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(counter as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A step of the analysis state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Render,
    VisionScoring,
    TextExtraction,
    TextScoring,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisStage::Render => "render",
            AnalysisStage::VisionScoring => "vision scoring",
            AnalysisStage::TextExtraction => "text extraction",
            AnalysisStage::TextScoring => "text scoring",
        };
        f.write_str(s)
    }
}

/// Called by the orchestrator as an analysis moves through its stages.
///
/// Implementations must be `Send + Sync`: one analyzer may serve many
/// concurrent requests, each firing events from its own task. All methods
/// have default no-op implementations.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once before the CV is rendered.
    fn on_analysis_start(&self, cv_path: &Path) {
        let _ = cv_path;
    }

    /// Called when the orchestrator enters a stage.
    fn on_stage(&self, stage: AnalysisStage) {
        let _ = stage;
    }

    /// Called when a stage failed and the orchestrator moves down the chain.
    fn on_fallback(&self, from: AnalysisStage, reason: &str) {
        let _ = (from, reason);
    }

    /// Called once with the final score.
    fn on_analysis_complete(&self, cv_path: &Path, score: f64) {
        let _ = (cv_path, score);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<AnalysisStage>>,
        fallbacks: Mutex<Vec<(AnalysisStage, String)>>,
    }

    impl AnalysisProgressCallback for Recorder {
        fn on_stage(&self, stage: AnalysisStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_fallback(&self, from: AnalysisStage, reason: &str) {
            self.fallbacks.lock().unwrap().push((from, reason.to_string()));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_analysis_start(Path::new("cv.pdf"));
        cb.on_stage(AnalysisStage::Render);
        cb.on_fallback(AnalysisStage::VisionScoring, "503");
        cb.on_analysis_complete(Path::new("cv.pdf"), 42.0);
    }

    #[test]
    fn recorder_receives_events_in_order() {
        let rec = Recorder::default();
        rec.on_stage(AnalysisStage::Render);
        rec.on_stage(AnalysisStage::VisionScoring);
        rec.on_fallback(AnalysisStage::VisionScoring, "timeout");
        rec.on_stage(AnalysisStage::TextExtraction);

        assert_eq!(
            *rec.stages.lock().unwrap(),
            vec![
                AnalysisStage::Render,
                AnalysisStage::VisionScoring,
                AnalysisStage::TextExtraction
            ]
        );
        assert_eq!(rec.fallbacks.lock().unwrap()[0].1, "timeout");
    }

    #[test]
    fn stage_display_is_human_readable() {
        assert_eq!(AnalysisStage::TextScoring.to_string(), "text scoring");
    }
}
