//! # cv-analyzer
//!
//! Score how well a candidate's CV fits a job posting with a chat-completion
//! model, for applicant-tracking applications.
//!
//! ## Pipeline Overview
//!
//! ```text
//! CV (PDF)
//!  │
//!  ├─ 1. Render   first pages → images via pdfium (spawn_blocking)
//!  ├─ 2. Prompt   job posting + JPEG pages, batched across user turns
//!  ├─ 3. Score    one chat-completion call with the vision profile
//!  │     └─ on failure, or when the CV does not render:
//!  ├─ 4. Extract  text layer via pdf-extract
//!  ├─ 5. Score    one call with the text profile
//!  └─ 6. Parse    `SCORE:` line → 0–100, analysis text with ASCII quotes
//! ```
//!
//! Every per-call failure ends in an [`AnalysisResult`] (score 0 when no
//! score could be obtained). Only building the analyzer can fail, and only
//! for configuration reasons such as a missing API key.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cv_analyzer::{AnalysisConfig, CvAnalyzer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads OPENAI_API_KEY; fails here, at startup, if it is missing.
//!     let analyzer = CvAnalyzer::from_env(AnalysisConfig::default())?;
//!
//!     let result = analyzer
//!         .analyze("uploads/jane_doe.pdf", "Backend developer", "3+ years of Rust")
//!         .await;
//!     println!("{} ({:?})\n{}", result.score, result.path, result.analysis);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cv-analyze` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy + futures) |
//!
//! ## Rendering toolchain
//!
//! pdfium is loaded from `AnalysisConfig::pdfium_library_path`, then
//! `PDFIUM_LIB_PATH`, then the system library path. Without it every CV
//! takes the text-extraction path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_cv, analyze_cv_sync, CvAnalyzer, CvAnalyzerBuilder};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ModelProfile};
pub use error::{AnalyzerError, PipelineError};
pub use output::{AnalysisPath, AnalysisResult, UNREADABLE_CV_MESSAGE};
pub use pipeline::extract::{PdfTextExtractor, TextExtractor};
pub use pipeline::input::CvDocument;
pub use pipeline::prompt::{AnalysisRequest, CvContent, JobPosting, Prompt, PromptKind};
pub use pipeline::render::{PageRenderer, PdfiumRenderer, RenderOptions, RenderedPage};
pub use pipeline::response::ScoreStatus;
pub use pipeline::scoring::{ChatCompletionsClient, CompletionBackend};
pub use progress::{AnalysisProgressCallback, AnalysisStage, NoopProgressCallback, ProgressCallback};
