/// LLM Client: the single point of entry for all Claude API calls in the analyzer.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// The pipeline only sees the `LanguageModel` trait; retries and the
/// request-level timeout live in the pipeline (see `crate::retry`).
///
/// Model: claude-sonnet-4-5 (hardcoded, not configurable)
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::retry::Retryable;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM call timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Authentication rejected (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Stamps the number of retries onto a rate-limit error once the retry
    /// loop has given up.
    pub fn after_attempts(self, attempts: u32) -> Self {
        match self {
            LlmError::RateLimited { .. } => LlmError::RateLimited {
                retries: attempts.saturating_sub(1),
            },
            other => other,
        }
    }
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::Auth { .. })
    }
}

/// A text-in, text-out language model.
///
/// `invoke` may be slow, may truncate at `max_tokens`, may fail transiently
/// and may return text that is not valid JSON.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Anthropic Messages API client. One HTTP request per `invoke`.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    system: &'static str,
}

impl AnthropicClient {
    pub fn new(api_key: String, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            api_key,
            system: prompts::JSON_ONLY_SYSTEM,
        })
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn invoke(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens,
            system: self.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("LLM API returned {}: {}", status, message);
            return Err(classify_status(status.as_u16(), message));
        }

        let llm_response: LlmResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );
        if llm_response.stop_reason.as_deref() == Some("max_tokens") {
            warn!("LLM output hit max_tokens={max_tokens}; response is truncated");
        }

        llm_response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Maps a non-success HTTP status to a typed error.
fn classify_status(status: u16, message: String) -> LlmError {
    match status {
        401 | 403 => LlmError::Auth { status, message },
        429 => LlmError::RateLimited { retries: 0 },
        _ => LlmError::Api { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status_auth() {
        assert!(matches!(
            classify_status(401, "invalid x-api-key".to_string()),
            LlmError::Auth { status: 401, .. }
        ));
        assert!(matches!(
            classify_status(403, String::new()),
            LlmError::Auth { status: 403, .. }
        ));
    }

    #[test]
    fn test_classify_status_rate_limit_and_server_error() {
        assert!(matches!(
            classify_status(429, String::new()),
            LlmError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_status(529, "overloaded".to_string()),
            LlmError::Api { status: 529, .. }
        ));
    }

    #[test]
    fn test_auth_is_not_retryable() {
        let auth = LlmError::Auth {
            status: 401,
            message: String::new(),
        };
        assert!(!auth.is_retryable());
        assert!(LlmError::RateLimited { retries: 0 }.is_retryable());
        assert!(LlmError::EmptyContent.is_retryable());
    }

    #[test]
    fn test_after_attempts_stamps_rate_limit_retries() {
        let err = LlmError::RateLimited { retries: 0 }.after_attempts(3);
        assert!(matches!(err, LlmError::RateLimited { retries: 2 }));
        assert!(matches!(
            LlmError::EmptyContent.after_attempts(3),
            LlmError::EmptyContent
        ));
    }

    #[test]
    fn test_response_text_picks_first_text_block() {
        let json = r#"{
            "content": [
                {"type": "tool_use", "text": null},
                {"type": "text", "text": "{\"fitScore\": 70}"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5},
            "stop_reason": "end_turn"
        }"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("{\"fitScore\": 70}"));
    }
}
