//! **Speech-to-Text (STT)**: turn a recorded [`Utterance`] into text.

use crate::error::{VoiceError, VoiceResult};
use crate::utterance::Utterance;
use crate::vad::to_i16;
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;

/// Backend for converting one utterance to text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Returns an empty string if nothing intelligible was said.
    async fn transcribe(&self, utterance: &Utterance) -> VoiceResult<String>;
}

/// Encode mono f32 PCM as 16-bit WAV for upload.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> VoiceResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            writer.write_sample(to_i16(s))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// `en-US` → `en`. The transcription API wants ISO-639-1.
fn iso_language(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Production STT backend: OpenAI-compatible `/audio/transcriptions` API.
#[derive(Debug, Clone)]
pub struct OpenAiTranscriber {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    base_url: String,
    api_key: String,
    /// Model: whisper-1 or gpt-4o-transcribe, etc.
    model: String,
    language: String,
    client: reqwest::Client,
}

impl OpenAiTranscriber {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            language: "en".to_string(),
            client,
        })
    }

    /// Recognition language as a BCP-47 tag (e.g. `en-US`).
    pub fn with_language(mut self, tag: &str) -> Self {
        let language = iso_language(tag);
        if !language.is_empty() {
            self.language = language;
        }
        self
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, utterance: &Utterance) -> VoiceResult<String> {
        if utterance.samples.is_empty() {
            return Ok(String::new());
        }
        let wav = encode_wav(&utterance.samples, utterance.sample_rate)?;
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("answer.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Stt(format!("STT API error {}: {}", status, body)));
        }
        let parsed: TranscriptionResponse = res
            .json()
            .await
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(parsed.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_has_riff_header_and_sixteen_bit_samples() {
        let wav = encode_wav(&[0.0, 0.5, -0.5, 1.0], 16000).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 4 * 2);
    }

    #[test]
    fn language_tag_is_reduced_to_iso_code() {
        assert_eq!(iso_language("en-US"), "en");
        assert_eq!(iso_language("pt_BR"), "pt");
        assert_eq!(iso_language("fr"), "fr");
    }

    #[test]
    fn blank_language_keeps_default() {
        let stt = OpenAiTranscriber::new("http://localhost", "k", "whisper-1", Duration::from_secs(1))
            .unwrap()
            .with_language("");
        assert_eq!(stt.language, "en");
    }
}
