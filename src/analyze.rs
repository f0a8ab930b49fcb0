//! Analysis orchestration: the vision → text → fixed-message fallback chain.
//!
//! ## State machine
//!
//! ```text
//! Start ──render──▶ pages? ──yes──▶ ImagePath ──ok──────────────▶ Done (Vision)
//!                     │                 │ service/encode failure
//!                     no                ▼
//!                     ▼            TextFallback ─┐
//!                  TextPath ─────────────────────┤
//!                                                ▼
//!                          extract ──fail──▶ Done (Unreadable, score 0)
//!                             │ ok
//!                             ▼
//!                       text scoring ──ok──▶ Done (Text / TextFallback)
//!                             └──fail──────▶ Done (ServiceFailed, score 0)
//! ```
//!
//! Nothing is persisted between calls. The only `Err` a caller can see comes
//! from building the analyzer (missing credential, invalid configuration);
//! every per-call failure ends in an [`AnalysisResult`].

use crate::config::AnalysisConfig;
use crate::error::{AnalyzerError, PipelineError};
use crate::output::{AnalysisPath, AnalysisResult, UNREADABLE_CV_MESSAGE};
use crate::pipeline::extract::{self, PdfTextExtractor, TextExtractor};
use crate::pipeline::input::CvDocument;
use crate::pipeline::prompt::{self, AnalysisRequest, CvContent, JobPosting, PromptOptions};
use crate::pipeline::render::{self, PageRenderer, PdfiumRenderer, RenderOptions, RenderedPage};
use crate::pipeline::response::{normalize_quotes, parse_completion, ParsedCompletion, ScoreStatus};
use crate::pipeline::scoring::{ChatCompletionsClient, CompletionBackend};
use crate::progress::AnalysisStage;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Scores CVs against job postings.
///
/// Cheap to clone and safe to share across request handlers: every part is
/// behind an `Arc` and no call mutates shared state.
#[derive(Clone)]
pub struct CvAnalyzer {
    config: Arc<AnalysisConfig>,
    backend: Arc<dyn CompletionBackend>,
    renderer: Arc<dyn PageRenderer>,
    extractor: Arc<dyn TextExtractor>,
}

impl fmt::Debug for CvAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CvAnalyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CvAnalyzer`]; every backend defaults to the production one.
pub struct CvAnalyzerBuilder {
    config: AnalysisConfig,
    backend: Option<Arc<dyn CompletionBackend>>,
    renderer: Option<Arc<dyn PageRenderer>>,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl CvAnalyzerBuilder {
    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build the analyzer.
    ///
    /// Without an explicit backend the API key is read from
    /// `config.api_key_env`; its absence is [`AnalyzerError::MissingCredential`].
    pub fn build(self) -> Result<CvAnalyzer, AnalyzerError> {
        let backend = match self.backend {
            Some(b) => b,
            None => Arc::new(ChatCompletionsClient::from_env(&self.config)?),
        };

        Ok(CvAnalyzer {
            config: Arc::new(self.config),
            backend,
            renderer: self.renderer.unwrap_or_else(|| Arc::new(PdfiumRenderer)),
            extractor: self.extractor.unwrap_or_else(|| Arc::new(PdfTextExtractor)),
        })
    }
}

impl CvAnalyzer {
    pub fn builder(config: AnalysisConfig) -> CvAnalyzerBuilder {
        CvAnalyzerBuilder {
            config,
            backend: None,
            renderer: None,
            extractor: None,
        }
    }

    /// Production analyzer: pdfium, pdf-extract and the chat-completions client.
    pub fn from_env(config: AnalysisConfig) -> Result<Self, AnalyzerError> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyse the CV stored at `cv_path` against a job posting.
    pub async fn analyze(
        &self,
        cv_path: impl AsRef<Path>,
        job_description: &str,
        job_requirements: &str,
    ) -> AnalysisResult {
        let document = CvDocument::from_path(cv_path.as_ref());
        let job = JobPosting::new(job_description, job_requirements);
        self.analyze_document(&document, &job).await
    }

    /// Analyse a CV held in memory. The bytes are spilled to a temp file that
    /// is removed before this returns.
    pub async fn analyze_bytes(&self, bytes: &[u8], filename: &str, job: &JobPosting) -> AnalysisResult {
        match CvDocument::from_bytes(bytes, filename) {
            Ok(document) => self.analyze_document(&document, job).await,
            Err(e) => {
                let start = Instant::now();
                let cv_path = Path::new(filename);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_analysis_start(cv_path);
                }
                warn!("Cannot stage CV '{}' for analysis: {}", filename, e);
                let result = finish(unreadable(None), start);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_analysis_complete(cv_path, result.score);
                }
                result
            }
        }
    }

    /// Run the full fallback chain for one document.
    pub async fn analyze_document(&self, document: &CvDocument, job: &JobPosting) -> AnalysisResult {
        let start = Instant::now();
        let pdf_path = document.path();
        info!("Analysing CV: {}", pdf_path.display());
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_analysis_start(pdf_path);
        }

        // ── Step 1: Render ───────────────────────────────────────────────
        self.enter(AnalysisStage::Render);
        let pages = match render::try_render_pages(
            Arc::clone(&self.renderer),
            pdf_path,
            RenderOptions::from_config(&self.config),
        )
        .await
        {
            Ok(pages) => pages,
            Err(e) => {
                warn!("{}; using text extraction", e);
                self.fallback(AnalysisStage::Render, &e);
                Vec::new()
            }
        };

        // ── Step 2: Vision, falling back to text ─────────────────────────
        let result = if pages.is_empty() {
            self.text_path(pdf_path, job, AnalysisPath::Text, None).await
        } else {
            info!("Rendered {} page(s); scoring with vision profile", pages.len());
            match self.vision_path(job, pages).await {
                Ok(parsed) => scored(parsed, AnalysisPath::Vision, None),
                Err(e) => {
                    warn!("Vision analysis failed: {}; falling back to text", e);
                    self.fallback(AnalysisStage::VisionScoring, &e);
                    self.text_path(pdf_path, job, AnalysisPath::TextFallback, Some(e.to_string()))
                        .await
                }
            }
        };

        let result = finish(result, start);
        info!(
            "CV analysis complete: score {} via {:?} in {}ms",
            result.score, result.path, result.duration_ms
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_analysis_complete(pdf_path, result.score);
        }
        result
    }

    /// ImagePath: assemble the vision prompt and score it.
    async fn vision_path(
        &self,
        job: &JobPosting,
        pages: Vec<RenderedPage>,
    ) -> Result<ParsedCompletion, PipelineError> {
        self.enter(AnalysisStage::VisionScoring);
        let request = AnalysisRequest::new(job.clone(), CvContent::Pages(pages));
        let prompt = prompt::assemble(&request, &PromptOptions::from_config(&self.config))?;
        // Page bitmaps are no longer needed once encoded.
        drop(request);

        let completion = self
            .backend
            .complete(&prompt, &self.config.vision_profile)
            .await?;
        Ok(parse_completion(&completion))
    }

    /// TextPath / TextFallback: extract, then score with the text profile.
    async fn text_path(
        &self,
        pdf_path: &Path,
        job: &JobPosting,
        path: AnalysisPath,
        fallback_reason: Option<String>,
    ) -> AnalysisResult {
        self.enter(AnalysisStage::TextExtraction);
        let cv_text = match extract::extract_text(Arc::clone(&self.extractor), pdf_path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{}; CV is unreadable", e);
                self.fallback(AnalysisStage::TextExtraction, &e);
                return unreadable(fallback_reason);
            }
        };

        self.enter(AnalysisStage::TextScoring);
        let prompt = prompt::assemble_text(job, &cv_text, &PromptOptions::from_config(&self.config));
        match self.backend.complete(&prompt, &self.config.text_profile).await {
            Ok(completion) => scored(parse_completion(&completion), path, fallback_reason),
            Err(e) => {
                warn!("Text analysis failed: {}", e);
                self.fallback(AnalysisStage::TextScoring, &e);
                AnalysisResult {
                    analysis: format!("CV analysis failed: {e}"),
                    score: 0.0,
                    path: AnalysisPath::ServiceFailed,
                    score_status: ScoreStatus::NotScored,
                    fallback_reason,
                    duration_ms: 0,
                }
            }
        }
    }

    fn enter(&self, stage: AnalysisStage) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage(stage);
        }
    }

    fn fallback(&self, from: AnalysisStage, error: &PipelineError) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_fallback(from, &error.to_string());
        }
    }
}

fn scored(parsed: ParsedCompletion, path: AnalysisPath, fallback_reason: Option<String>) -> AnalysisResult {
    AnalysisResult {
        analysis: parsed.analysis,
        score: parsed.score,
        path,
        score_status: parsed.status,
        fallback_reason,
        duration_ms: 0,
    }
}

fn unreadable(fallback_reason: Option<String>) -> AnalysisResult {
    AnalysisResult {
        analysis: UNREADABLE_CV_MESSAGE.to_string(),
        score: 0.0,
        path: AnalysisPath::Unreadable,
        score_status: ScoreStatus::NotScored,
        fallback_reason,
        duration_ms: 0,
    }
}

/// Normalise the text for storage and stamp the elapsed time.
fn finish(mut result: AnalysisResult, start: Instant) -> AnalysisResult {
    result.analysis = normalize_quotes(&result.analysis);
    result.duration_ms = start.elapsed().as_millis() as u64;
    result
}

/// One-call contract: analyse `cv_path` with the default configuration.
///
/// Reads the API key from `OPENAI_API_KEY`; its absence is the only error.
///
/// # Example
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), cv_analyzer::AnalyzerError> {
/// let (analysis, score) = cv_analyzer::analyze_cv(
///     "uploads/jane_doe.pdf",
///     "Backend developer for our payments team",
///     "3+ years of Rust; PostgreSQL",
/// )
/// .await?;
/// println!("{score}: {analysis}");
/// # Ok(())
/// # }
/// ```
pub async fn analyze_cv(
    cv_path: impl AsRef<Path>,
    job_description: &str,
    job_requirements: &str,
) -> Result<(String, f64), AnalyzerError> {
    let analyzer = CvAnalyzer::from_env(AnalysisConfig::default())?;
    Ok(analyzer
        .analyze(cv_path, job_description, job_requirements)
        .await
        .into_pair())
}

/// Synchronous wrapper around [`analyze_cv`] for non-async callers.
///
/// Creates a temporary tokio runtime internally; do not call it from inside
/// an async context.
pub fn analyze_cv_sync(
    cv_path: impl AsRef<Path>,
    job_description: &str,
    job_requirements: &str,
) -> Result<(String, f64), AnalyzerError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalyzerError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze_cv(cv_path, job_description, job_requirements))
}
