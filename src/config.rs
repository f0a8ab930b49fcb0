//! Configuration types for CV analysis.
//!
//! All analysis behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. One struct holds every knob so the same
//! config can be shared by every request handler and logged on startup.

use crate::error::AnalyzerError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default chat-completion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default environment variable holding the bearer token.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Upper bound on CV pages sent as images in one request.
pub const MAX_PAGES_CAP: usize = 5;

/// Model identifier plus the sampling parameters sent with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ModelProfile {
    pub fn new(model: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            temperature: temperature.clamp(0.0, 2.0),
        }
    }

    /// Vision-capable profile used when the prompt carries page images.
    pub fn vision_default() -> Self {
        Self::new("gpt-4o", 1500, 0.2)
    }

    /// Cheaper text-only profile used for the extraction path.
    pub fn text_default() -> Self {
        Self::new("gpt-3.5-turbo", 1000, 0.5)
    }
}

/// Configuration for CV analysis.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use cv_analyzer::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .dpi(200)
///     .max_pages(3)
///     .vision_model("gpt-4o-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_pages, 3);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Rendering DPI for each CV page. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Longest edge of a rendered page in pixels. Default: 2000.
    ///
    /// Applied after the DPI scale so a poster-sized page cannot allocate an
    /// unbounded bitmap.
    pub max_rendered_pixels: u32,

    /// Pages sent as images. Range: 1–5. Default: 5.
    pub max_pages: usize,

    /// Images per user turn before a continuation turn is opened. Default: 2.
    pub images_per_turn: usize,

    /// JPEG quality for inlined page images. Range: 1–100. Default: 80.
    pub jpeg_quality: u8,

    /// Characters of extracted CV text kept in the text prompt. Default: 4000.
    pub text_char_limit: usize,

    /// Profile for prompts carrying page images.
    pub vision_profile: ModelProfile,

    /// Profile for text-only prompts.
    pub text_profile: ModelProfile,

    /// Chat-completion endpoint URL.
    pub endpoint: String,

    /// Environment variable read for the bearer token. Default: `OPENAI_API_KEY`.
    pub api_key_env: String,

    /// Outbound request timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Explicit pdfium shared library. Falls back to `PDFIUM_LIB_PATH`, then
    /// the system library search path.
    pub pdfium_library_path: Option<PathBuf>,

    /// Optional observer for stage transitions.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 2000,
            max_pages: MAX_PAGES_CAP,
            images_per_turn: 2,
            jpeg_quality: 80,
            text_char_limit: 4000,
            vision_profile: ModelProfile::vision_default(),
            text_profile: ModelProfile::text_default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_timeout_secs: 60,
            pdfium_library_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("max_pages", &self.max_pages)
            .field("images_per_turn", &self.images_per_turn)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("text_char_limit", &self.text_char_limit)
            .field("vision_profile", &self.vision_profile)
            .field("text_profile", &self.text_profile)
            .field("endpoint", &self.endpoint)
            .field("api_key_env", &self.api_key_env)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// pdfium library to bind: explicit setting, then `PDFIUM_LIB_PATH`.
    pub fn resolved_pdfium_path(&self) -> Option<PathBuf> {
        self.pdfium_library_path.clone().or_else(|| {
            std::env::var_os("PDFIUM_LIB_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n.clamp(1, MAX_PAGES_CAP);
        self
    }

    pub fn images_per_turn(mut self, n: usize) -> Self {
        self.config.images_per_turn = n.max(1);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn text_char_limit(mut self, n: usize) -> Self {
        self.config.text_char_limit = n;
        self
    }

    pub fn vision_profile(mut self, profile: ModelProfile) -> Self {
        self.config.vision_profile = profile;
        self
    }

    pub fn text_profile(mut self, profile: ModelProfile) -> Self {
        self.config.text_profile = profile;
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_profile.model = model.into();
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_profile.model = model.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.config.api_key_env = var.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalyzerError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(AnalyzerError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.max_pages == 0 || c.max_pages > MAX_PAGES_CAP {
            return Err(AnalyzerError::InvalidConfig(format!(
                "max_pages must be 1–{MAX_PAGES_CAP}, got {}",
                c.max_pages
            )));
        }
        if c.images_per_turn == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "images_per_turn must be ≥ 1".into(),
            ));
        }
        if c.text_char_limit == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "text_char_limit must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.vision_profile.model.trim().is_empty() || c.text_profile.model.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig(
                "model identifiers must not be empty".into(),
            ));
        }
        if !(c.endpoint.starts_with("https://") || c.endpoint.starts_with("http://")) {
            return Err(AnalyzerError::InvalidConfig(format!(
                "endpoint must be an HTTP(S) URL, got '{}'",
                c.endpoint
            )));
        }
        Ok(self.config)
    }
}
