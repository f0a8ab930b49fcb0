//! Scoring client: one chat-completion call per prompt.
//!
//! This is the only stage with network I/O. There is no retry here; the
//! orchestrator decides what a failure means (fall back from vision to text,
//! or give up with a zero score).
//!
//! The request body is the plain chat-completions shape
//! `{model, messages, max_tokens, temperature}` sent with a bearer token.
//! TLS goes through rustls with certificate verification left on.

use crate::config::{AnalysisConfig, ModelProfile};
use crate::error::{AnalyzerError, PipelineError};
use crate::pipeline::prompt::{ChatTurn, Prompt};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Sends an assembled prompt to a completion service.
///
/// Carried by the analyzer as `Arc<dyn CompletionBackend>`, so tests and
/// embedding applications can substitute their own transport.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Return the raw completion text for `prompt` under `profile`.
    async fn complete(&self, prompt: &Prompt, profile: &ModelProfile) -> Result<String, PipelineError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Chat-completions client authenticated with a bearer token.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ChatCompletionsClient {
    /// Build a client with an explicit key.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, AnalyzerError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AnalyzerError::MissingCredential {
                var: "api_key".into(),
            });
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AnalyzerError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key,
            timeout_secs,
        })
    }

    /// Build a client reading the key from `config.api_key_env`.
    ///
    /// An absent or empty variable is a fatal configuration error.
    pub fn from_env(config: &AnalysisConfig) -> Result<Self, AnalyzerError> {
        let var = &config.api_key_env;
        let key = std::env::var(var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AnalyzerError::MissingCredential { var: var.clone() })?;

        Self::new(config.endpoint.clone(), key, config.api_timeout_secs)
    }

    fn map_send_error(&self, e: reqwest::Error) -> PipelineError {
        if e.is_timeout() {
            PipelineError::ServiceTimeout {
                secs: self.timeout_secs,
            }
        } else {
            PipelineError::ServiceCallFailed {
                status: e.status().map(|s| s.as_u16()),
                detail: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionsClient {
    async fn complete(&self, prompt: &Prompt, profile: &ModelProfile) -> Result<String, PipelineError> {
        let start = Instant::now();
        let body = ChatCompletionRequest {
            model: &profile.model,
            messages: &prompt.turns,
            max_tokens: profile.max_tokens,
            temperature: profile.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(PipelineError::ServiceCallFailed {
                status: Some(status.as_u16()),
                detail: error_detail(&raw),
            });
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|e| self.map_send_error(e))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "{}: {} input tokens, {} output tokens, {:?}",
                profile.model,
                usage.prompt_tokens,
                usage.completion_tokens,
                start.elapsed()
            );
        }

        completion_text(parsed)
    }
}

/// `choices[0].message.content`, rejecting absent or blank content.
fn completion_text(response: ChatCompletionResponse) -> Result<String, PipelineError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(PipelineError::EmptyCompletion)
}

/// Prefer the service's `error.message`, else the raw body (bounded).
fn error_detail(raw: &str) -> String {
    serde_json::from_str::<ApiError>(raw)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| raw.chars().take(300).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::prompt::{assemble_text, JobPosting, PromptOptions};

    fn text_prompt() -> Prompt {
        assemble_text(
            &JobPosting::new("Data engineer", "SQL"),
            "Jane Doe",
            &PromptOptions::default(),
        )
    }

    #[test]
    fn request_body_has_expected_shape() {
        let prompt = text_prompt();
        let profile = ModelProfile::text_default();
        let body = ChatCompletionRequest {
            model: &profile.model,
            messages: &prompt.turns,
            max_tokens: profile.max_tokens,
            temperature: profile.temperature,
        };
        let json = serde_json::to_value(&body).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 4);
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json["messages"][1]["content"].is_string());
    }

    #[test]
    fn extracts_first_choice_content() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"SCORE: 70"}}],
                "usage":{"prompt_tokens":10,"completion_tokens":3}}"#,
        )
        .unwrap();
        assert_eq!(completion_text(response).unwrap(), "SCORE: 70");
    }

    #[test]
    fn empty_choices_is_empty_completion() {
        let response: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(completion_text(response), Err(PipelineError::EmptyCompletion));

        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(completion_text(response), Err(PipelineError::EmptyCompletion));
    }

    #[test]
    fn error_detail_prefers_api_message() {
        assert_eq!(
            error_detail(r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#),
            "Incorrect API key provided"
        );
        assert_eq!(error_detail("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn blank_key_is_missing_credential() {
        let err = ChatCompletionsClient::new("https://example.com", "  ", 60).unwrap_err();
        assert!(matches!(err, AnalyzerError::MissingCredential { .. }));
    }

    #[test]
    fn from_env_requires_variable() {
        let config = AnalysisConfig::builder()
            .api_key_env("CV_ANALYZER_TEST_UNSET_KEY_7f3a")
            .build()
            .unwrap();
        match ChatCompletionsClient::from_env(&config).unwrap_err() {
            AnalyzerError::MissingCredential { var } => {
                assert_eq!(var, "CV_ANALYZER_TEST_UNSET_KEY_7f3a")
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn debug_redacts_key() {
        let client = ChatCompletionsClient::new("https://example.com", "sk-secret", 60).unwrap();
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("sk-secret"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_service_failure() {
        // Port 9 (discard) on localhost is closed on test hosts.
        let client = ChatCompletionsClient::new("http://127.0.0.1:9/v1/chat/completions", "sk-test", 5)
            .unwrap();
        let err = client
            .complete(&text_prompt(), &ModelProfile::text_default())
            .await
            .unwrap_err();
        assert!(err.is_service_failure(), "got: {err}");
    }
}
