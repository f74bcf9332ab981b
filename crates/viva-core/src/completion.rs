//! Completion client: the whole transcript in, one assistant reply out.
//!
//! Stateless. Every call replays the full transcript and nothing is retried;
//! the session decides what a failure means.

use crate::error::UpstreamError;
use crate::transcript::Turn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, turns: &[Turn]) -> Result<String, UpstreamError>;
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 300,
        }
    }
}

// OpenAI-compatible request/response
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Pull `choices[0].message.content` out of a response body.
fn extract_reply(body: &str) -> Result<String, UpstreamError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| UpstreamError::Malformed("response has no choices".to_string()))?
        .message
        .content
        .unwrap_or_default();
    if content.trim().is_empty() {
        return Err(UpstreamError::Malformed("reply content is empty".to_string()));
    }
    Ok(content)
}

/// Chat completions over any OpenAI-compatible endpoint.
pub struct OpenAiCompletion {
    base_url: String,
    api_key: String,
    model: String,
    params: GenerationParams,
    client: reqwest::Client,
}

impl OpenAiCompletion {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into().trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            params: GenerationParams::default(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&'a self, turns: &'a [Turn]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: turns,
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletion {
    async fn complete(&self, turns: &[Turn]) -> Result<String, UpstreamError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, turns = turns.len(), "Completion: sending transcript");

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request(turns))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        extract_reply(&body)
    }
}
