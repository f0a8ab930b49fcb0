//! CLI binary for cv-analyzer.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, scores one or more CVs against a job posting and prints
//! the results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use cv_analyzer::{
    AnalysisConfig, AnalysisPath, AnalysisProgressCallback, AnalysisResult, AnalysisStage,
    CvAnalyzer, JobPosting, ProgressCallback,
};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Batch progress bar: one tick per analysed CV, one log line per fallback.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} CVs  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Analysing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Remove the bar once every CV has been analysed.
    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_fallback(&self, from: AnalysisStage, reason: &str) {
        // Keep log lines on one terminal row.
        let msg: String = if reason.chars().count() > 80 {
            format!("{}\u{2026}", reason.chars().take(79).collect::<String>())
        } else {
            reason.to_string()
        };
        self.bar
            .println(format!("  {} {} failed: {}", cyan("↪"), from, dim(&msg)));
    }

    // Success or failure is only known from the result; the report marks it.
    fn on_analysis_complete(&self, cv_path: &Path, score: f64) {
        self.bar.println(format!(
            "  {} {:<40} {}",
            dim("·"),
            cv_path.display(),
            bold(&format!("{score:>5.1}")),
        ));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Score one CV
  cv-analyze jane_doe.pdf --description "Backend developer" --requirements "3+ years of Rust"

  # Job posting from files, JSON output
  cv-analyze cv.pdf --description-file job.txt --requirements-file reqs.txt --json

  # Batch of CVs, four at a time
  cv-analyze uploads/*.pdf --description-file job.txt --requirements-file reqs.txt -c 4

  # Use an explicit pdfium build
  cv-analyze cv.pdf --pdfium-lib /opt/pdfium/lib/libpdfium.so --description ... --requirements ...

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY              Bearer token for the completion endpoint (required)
  CV_ANALYZER_VISION_MODEL    Override the vision model
  CV_ANALYZER_TEXT_MODEL      Override the text model
  CV_ANALYZER_ENDPOINT        Override the chat-completions endpoint
  PDFIUM_LIB_PATH             Path to libpdfium; without it the system library
                              path is searched, then text extraction is used

A .env file in the working directory is loaded before the environment is read.
"#;

/// Score CVs against a job posting with a chat-completion model.
#[derive(Parser, Debug)]
#[command(
    name = "cv-analyze",
    version,
    about = "Score CV / job-posting fit with a chat-completion model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// CV PDF files to analyse.
    #[arg(required = true)]
    cvs: Vec<PathBuf>,

    /// Job description text.
    #[arg(long, conflicts_with = "description_file")]
    description: Option<String>,

    /// File containing the job description.
    #[arg(long)]
    description_file: Option<PathBuf>,

    /// Job requirements text.
    #[arg(long, conflicts_with = "requirements_file")]
    requirements: Option<String>,

    /// File containing the job requirements.
    #[arg(long)]
    requirements_file: Option<PathBuf>,

    /// Model used when CV pages are sent as images.
    #[arg(long, env = "CV_ANALYZER_VISION_MODEL")]
    vision_model: Option<String>,

    /// Model used for the text-extraction path.
    #[arg(long, env = "CV_ANALYZER_TEXT_MODEL")]
    text_model: Option<String>,

    /// Chat-completions endpoint URL.
    #[arg(long, env = "CV_ANALYZER_ENDPOINT")]
    endpoint: Option<String>,

    /// Environment variable holding the API key.
    #[arg(long, env = "CV_ANALYZER_API_KEY_ENV", default_value = "OPENAI_API_KEY")]
    api_key_env: String,

    /// Rendering DPI (72–600).
    #[arg(long, env = "CV_ANALYZER_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Pages sent as images (1–5).
    #[arg(long, env = "CV_ANALYZER_MAX_PAGES", default_value_t = 5)]
    max_pages: usize,

    /// Images per user turn.
    #[arg(long, env = "CV_ANALYZER_IMAGES_PER_TURN", default_value_t = 2)]
    images_per_turn: usize,

    /// JPEG quality for page images (1–100).
    #[arg(long, env = "CV_ANALYZER_JPEG_QUALITY", default_value_t = 80)]
    jpeg_quality: u8,

    /// Characters of extracted text kept for the text path.
    #[arg(long, env = "CV_ANALYZER_TEXT_CHAR_LIMIT", default_value_t = 4000)]
    text_char_limit: usize,

    /// Outbound request timeout in seconds.
    #[arg(long, env = "CV_ANALYZER_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// CVs analysed at once in batch mode.
    #[arg(short, long, env = "CV_ANALYZER_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Output JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Disable the batch progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Serialize)]
struct CvReport<'a> {
    cv: &'a Path,
    #[serde(flatten)]
    result: &'a AnalysisResult,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; the environment may already be populated.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.cvs.len() > 1;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let job = read_job(&cli).await?;

    let bar = show_progress.then(|| CliProgressCallback::new(cli.cvs.len()));
    let progress: Option<ProgressCallback> = bar
        .clone()
        .map(|cb| cb as Arc<dyn AnalysisProgressCallback>);

    let config = build_config(&cli, progress)?;
    let analyzer = CvAnalyzer::from_env(config).context("Cannot start CV analyzer")?;

    // ── Run analyses ─────────────────────────────────────────────────────
    let mut results: Vec<(usize, AnalysisResult)> =
        stream::iter(cli.cvs.iter().enumerate().map(|(i, cv)| {
            let analyzer = analyzer.clone();
            let job = job.clone();
            async move {
                let result = analyzer
                    .analyze(cv, &job.description, &job.requirements)
                    .await;
                (i, result)
            }
        }))
        .buffer_unordered(cli.concurrency.max(1))
        .collect()
        .await;
    results.sort_by_key(|(i, _)| *i);
    if let Some(ref bar) = bar {
        bar.finish();
    }

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let reports: Vec<CvReport<'_>> = results
            .iter()
            .map(|(i, result)| CvReport {
                cv: &cli.cvs[*i],
                result,
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&reports).context("Failed to serialise results")?
        );
    } else {
        for (i, result) in &results {
            print_result(&cli.cvs[*i], result);
        }
    }

    if !cli.quiet && !cli.json {
        let scored = results.iter().filter(|(_, r)| r.is_scored()).count();
        eprintln!(
            "{} {}/{} CVs scored",
            if scored == results.len() {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&scored.to_string()),
            results.len()
        );
    }

    Ok(())
}

fn print_result(cv: &Path, result: &AnalysisResult) {
    let marker = match result.path {
        AnalysisPath::Vision | AnalysisPath::Text | AnalysisPath::TextFallback => green("●"),
        AnalysisPath::Unreadable | AnalysisPath::ServiceFailed => red("●"),
    };
    println!(
        "{} {}  {}  {}",
        marker,
        bold(&cv.display().to_string()),
        bold(&format!("{:.0}/100", result.score)),
        dim(&format!("{:?}, {:?}, {}ms", result.path, result.score_status, result.duration_ms)),
    );
    if let Some(ref reason) = result.fallback_reason {
        println!("  {}", dim(&format!("vision fallback: {reason}")));
    }
    println!("{}\n", result.analysis);
}

/// Resolve the job posting from inline text or files.
async fn read_job(cli: &Cli) -> Result<JobPosting> {
    let description = read_text_arg(&cli.description, &cli.description_file, "description").await?;
    let requirements =
        read_text_arg(&cli.requirements, &cli.requirements_file, "requirements").await?;
    Ok(JobPosting::new(description, requirements))
}

async fn read_text_arg(inline: &Option<String>, file: &Option<PathBuf>, what: &str) -> Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read job {what} from {:?}", path)),
        (None, None) => bail!("Provide the job {what} with --{what} or --{what}-file"),
    }
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .dpi(cli.dpi)
        .max_pages(cli.max_pages)
        .images_per_turn(cli.images_per_turn)
        .jpeg_quality(cli.jpeg_quality)
        .text_char_limit(cli.text_char_limit)
        .api_key_env(cli.api_key_env.clone())
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.vision_model {
        builder = builder.vision_model(model.clone());
    }
    if let Some(ref model) = cli.text_model {
        builder = builder.text_model(model.clone());
    }
    if let Some(ref url) = cli.endpoint {
        builder = builder.endpoint(url.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
