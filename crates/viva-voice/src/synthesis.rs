//! **Remote speech synthesis**: text in, encoded audio out.
//!
//! `OpenAiTts` talks to any OpenAI-compatible `/audio/speech` endpoint. The
//! returned bytes are whatever the service encodes (MP3 by default) and are
//! handed to an [`AudioPlayer`](crate::playback::AudioPlayer) untouched.

use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Maximum text input size for one synthesis request (4096 characters is the
/// documented OpenAI limit).
const MAX_TTS_INPUT_CHARS: usize = 4096;

/// Backend that turns text into encoded audio bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>>;
}

/// The fixed set of voice presets offered by the speech service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl Voice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: Voice,
    response_format: &'a str,
}

/// Production TTS backend: OpenAI-compatible `/audio/speech` API.
#[derive(Debug, Clone)]
pub struct OpenAiTts {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    base_url: String,
    api_key: String,
    /// TTS model: tts-1 (fast) or tts-1-hd (higher quality).
    model: String,
    voice: Voice,
    client: reqwest::Client,
}

impl OpenAiTts {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            voice: Voice::default(),
            client,
        })
    }

    /// Use a fixed voice preset instead of the default (alloy).
    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    pub fn voice(&self) -> Voice {
        self.voice
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/speech", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiTts {
    async fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        let text = text.trim();
        if text.chars().count() > MAX_TTS_INPUT_CHARS {
            return Err(VoiceError::Tts(format!(
                "text exceeds maximum size: {} characters (limit: {})",
                text.chars().count(),
                MAX_TTS_INPUT_CHARS
            )));
        }

        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice: self.voice,
            response_format: "mp3",
        };
        debug!(voice = %self.voice, chars = text.len(), "requesting speech synthesis");

        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VoiceError::Tts("TTS request timed out".to_string())
                } else {
                    VoiceError::Tts(e.to_string())
                }
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Tts(format!("TTS API error {}: {}", status, body)));
        }

        let bytes = res.bytes().await.map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Synthesizer used when no speech service is configured. Every request fails,
/// which routes speech to the local fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredSynthesizer;

#[async_trait]
impl SpeechSynthesizer for UnconfiguredSynthesizer {
    async fn synthesize(&self, _text: &str) -> VoiceResult<Vec<u8>> {
        Err(VoiceError::Tts(
            "no remote speech service configured".to_string(),
        ))
    }
}
