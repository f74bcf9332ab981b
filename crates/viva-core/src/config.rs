//! Runtime configuration: defaults, then an optional TOML file, then the
//! environment.
//!
//! | Source | Example |
//! |--------|---------|
//! | File at `VIVA_CONFIG` (default `config/viva[.toml]`) | `[completion]`<br>`model = "gpt-4o"` |
//! | Env, prefix `VIVA_`, `__` between section and key | `VIVA_COMPLETION__MODEL=gpt-4o` |
//! | `OPENAI_API_KEY` | used for every API key left unset |

use crate::completion::{GenerationParams, DEFAULT_BASE_URL, DEFAULT_MODEL};
use config::{ConfigError, FileFormat, FileSourceFile};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use viva_voice::{UtteranceConfig, Voice};

pub const DEFAULT_CONFIG_PATH: &str = "config/viva";

const REDACTED: &str = "[REDACTED]";

fn redact(key: &Option<String>) -> Option<&'static str> {
    key.as_ref().map(|_| REDACTED)
}

/// True for a present, non-blank key.
fn usable(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|k| !k.trim().is_empty())
}

/// Chat completion service.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for CompletionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl CompletionSettings {
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Remote speech synthesis plus the local fallback command.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub voice: Voice,
    pub timeout_secs: u64,
    /// Empty disables local fallback speech.
    pub fallback_program: String,
    pub fallback_args: Vec<String>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            voice: Voice::default(),
            timeout_secs: 30,
            fallback_program: "espeak-ng".to_string(),
            fallback_args: ["-v", "en-us", "-s", "175"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl fmt::Debug for SpeechSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("timeout_secs", &self.timeout_secs)
            .field("fallback_program", &self.fallback_program)
            .field("fallback_args", &self.fallback_args)
            .finish()
    }
}

impl SpeechSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    #[default]
    Microphone,
    Keyboard,
}

/// Answer capture: microphone with remote transcription, or typed lines.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub mode: CaptureMode,
    /// BCP-47 recognition language.
    pub language: String,
    pub transcription_model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub gap_ms: u64,
    pub min_speech_ms: u64,
    pub max_utterance_secs: u64,
    pub no_speech_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            mode: CaptureMode::default(),
            language: "en-US".to_string(),
            transcription_model: "whisper-1".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            gap_ms: 800,
            min_speech_ms: 200,
            max_utterance_secs: 30,
            no_speech_timeout_secs: 8,
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for CaptureSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSettings")
            .field("mode", &self.mode)
            .field("language", &self.language)
            .field("transcription_model", &self.transcription_model)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("gap_ms", &self.gap_ms)
            .field("min_speech_ms", &self.min_speech_ms)
            .field("max_utterance_secs", &self.max_utterance_secs)
            .field("no_speech_timeout_secs", &self.no_speech_timeout_secs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl CaptureSettings {
    pub fn utterance(&self) -> UtteranceConfig {
        UtteranceConfig {
            gap: Duration::from_millis(self.gap_ms),
            min_speech: Duration::from_millis(self.min_speech_ms),
            max_utterance: Duration::from_secs(self.max_utterance_secs),
            no_speech_timeout: Duration::from_secs(self.no_speech_timeout_secs),
            ..UtteranceConfig::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VivaConfig {
    pub completion: CompletionSettings,
    pub speech: SpeechSettings,
    pub capture: CaptureSettings,
}

impl VivaConfig {
    /// Load from the file named by `VIVA_CONFIG` (optional) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("VIVA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::build(config::File::with_name(&path).required(false))
    }

    /// Load from an explicit file (must exist) and the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::build(config::File::from(path))
    }

    fn build(file: config::File<FileSourceFile, FileFormat>) -> Result<Self, ConfigError> {
        let mut loaded: VivaConfig = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("VIVA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        loaded.fill_api_keys(std::env::var("OPENAI_API_KEY").ok());
        loaded.validate()?;
        Ok(loaded)
    }

    /// Every unset or blank API key takes `fallback`.
    pub fn fill_api_keys(&mut self, fallback: Option<String>) {
        let fallback = fallback.filter(|k| !k.trim().is_empty());
        for key in [
            &mut self.completion.api_key,
            &mut self.speech.api_key,
            &mut self.capture.api_key,
        ] {
            if !usable(key) {
                *key = fallback.clone();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.completion.temperature;
        if !(0.0..=2.0).contains(&t) {
            return Err(ConfigError::Message(format!(
                "completion.temperature must be within 0.0..=2.0, got {}",
                t
            )));
        }
        if self.completion.max_tokens == 0 {
            return Err(ConfigError::Message(
                "completion.max_tokens must be greater than 0".to_string(),
            ));
        }
        for (name, secs) in [
            ("completion.timeout_secs", self.completion.timeout_secs),
            ("speech.timeout_secs", self.speech.timeout_secs),
            ("capture.timeout_secs", self.capture.timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Message(format!("{} must be greater than 0", name)));
            }
        }
        Ok(())
    }
}
