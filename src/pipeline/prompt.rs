//! Prompt assembly: job posting + CV content → ordered conversation turns.
//!
//! ## Message Layout (vision)
//!
//! 1. **System turn**: reviewer persona ([`prompts::SYSTEM_PROMPT`])
//! 2. **First user turn**: job description and requirements, then the first
//!    page images
//! 3. **Continuation user turns**: a new turn every `images_per_turn` images,
//!    opened by `CV continued (page N)`
//! 4. **Final user turn**: the scoring instructions
//!
//! Splitting images across turns keeps each message under downstream payload
//! limits; the batch size is a tunable, not a protocol requirement.
//!
//! ## Message Layout (text)
//!
//! System turn plus one user turn carrying the job posting, the CV text cut
//! to `text_char_limit` characters, and the same instructions.

use crate::config::AnalysisConfig;
use crate::error::PipelineError;
use crate::pipeline::encode::{encode_jpeg, EncodedImage};
use crate::pipeline::render::RenderedPage;
use crate::prompts;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The job a CV is scored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub description: String,
    pub requirements: String,
}

impl JobPosting {
    pub fn new(description: impl Into<String>, requirements: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            requirements: requirements.into(),
        }
    }
}

/// What the model gets to see of the CV.
#[derive(Debug, Clone)]
pub enum CvContent {
    Pages(Vec<RenderedPage>),
    Text(String),
}

/// Everything needed to build one prompt. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    job: JobPosting,
    cv: CvContent,
}

impl AnalysisRequest {
    pub fn new(job: JobPosting, cv: CvContent) -> Self {
        Self { job, cv }
    }

    pub fn job(&self) -> &JobPosting {
        &self.job
    }

    pub fn cv(&self) -> &CvContent {
        &self.cv
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of the conversation, serialised in chat-completions layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: TurnContent,
}

impl ChatTurn {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Parts(parts),
        }
    }

    /// Number of inlined images in this turn.
    pub fn image_count(&self) -> usize {
        match &self.content {
            TurnContent::Text(_) => 0,
            TurnContent::Parts(parts) => parts
                .iter()
                .filter(|p| matches!(p, ContentPart::ImageUrl { .. }))
                .count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(image: &EncodedImage) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.to_data_url(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Vision,
    Text,
}

/// An assembled conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub turns: Vec<ChatTurn>,
    /// 0-based indices of the CV pages inlined, in order.
    pub page_indices: Vec<usize>,
}

impl Prompt {
    pub fn image_count(&self) -> usize {
        self.turns.iter().map(ChatTurn::image_count).sum()
    }
}

/// Assembly parameters derived from [`AnalysisConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptOptions {
    pub max_pages: usize,
    pub images_per_turn: usize,
    pub jpeg_quality: u8,
    pub text_char_limit: usize,
}

impl PromptOptions {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            images_per_turn: config.images_per_turn,
            jpeg_quality: config.jpeg_quality,
            text_char_limit: config.text_char_limit,
        }
    }
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

/// Build the prompt for a request.
///
/// Fails only for a page request where no page could be encoded; the
/// orchestrator treats that like a rendering failure.
pub fn assemble(request: &AnalysisRequest, options: &PromptOptions) -> Result<Prompt, PipelineError> {
    match request.cv() {
        CvContent::Pages(pages) => assemble_vision(request.job(), pages, options),
        CvContent::Text(text) => Ok(assemble_text(request.job(), text, options)),
    }
}

/// Vision prompt from at most `max_pages` rendered pages.
pub fn assemble_vision(
    job: &JobPosting,
    pages: &[RenderedPage],
    options: &PromptOptions,
) -> Result<Prompt, PipelineError> {
    let encoded: Vec<(usize, EncodedImage)> = pages
        .iter()
        .take(options.max_pages)
        .filter_map(|page| match encode_jpeg(&page.image, options.jpeg_quality) {
            Ok(img) => Some((page.index, img)),
            Err(e) => {
                warn!("Failed to encode page {}: {}", page.index + 1, e);
                None
            }
        })
        .collect();

    if encoded.is_empty() {
        return Err(PipelineError::RenderingUnavailable {
            detail: "no CV page could be encoded".into(),
        });
    }

    let per_turn = options.images_per_turn.max(1);
    let mut turns = vec![ChatTurn::system(prompts::SYSTEM_PROMPT)];
    let mut content = vec![ContentPart::text(prompts::vision_intro(
        &job.description,
        &job.requirements,
    ))];

    for (i, (_, image)) in encoded.iter().enumerate() {
        content.push(ContentPart::image(image));

        let placed = i + 1;
        if placed % per_turn == 0 && placed < encoded.len() {
            turns.push(ChatTurn::user_parts(std::mem::take(&mut content)));
            let next_page = encoded[placed].0 + 1;
            content.push(ContentPart::text(prompts::continuation(next_page)));
        }
    }
    turns.push(ChatTurn::user_parts(content));
    turns.push(ChatTurn::user(prompts::ANALYSIS_INSTRUCTIONS));

    let page_indices: Vec<usize> = encoded.iter().map(|(idx, _)| *idx).collect();
    debug!(
        "Assembled vision prompt: {} turns, pages {:?}",
        turns.len(),
        page_indices
    );

    Ok(Prompt {
        kind: PromptKind::Vision,
        turns,
        page_indices,
    })
}

/// Text-only prompt; the CV text is cut to `text_char_limit` characters.
pub fn assemble_text(job: &JobPosting, cv_text: &str, options: &PromptOptions) -> Prompt {
    let cv_text = truncate_chars(cv_text, options.text_char_limit);
    let turns = vec![
        ChatTurn::system(prompts::SYSTEM_PROMPT),
        ChatTurn::user(prompts::text_prompt(
            &job.description,
            &job.requirements,
            cv_text,
        )),
    ];

    Prompt {
        kind: PromptKind::Text,
        turns,
        page_indices: Vec::new(),
    }
}

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}
