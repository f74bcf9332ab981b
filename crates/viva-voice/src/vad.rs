//! Voice Activity Detection using WebRTC VAD

use crate::error::{VoiceError, VoiceResult};
use tracing::debug;
use webrtc_vad::{SampleRate, Vad, VadMode};

/// Configuration for VAD detection
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Sample rate (must be 8000, 16000, 32000, or 48000 Hz for WebRTC VAD)
    pub sample_rate: u32,

    /// Detection mode (0-3, where 3 is most aggressive)
    pub mode: u8,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            mode: 2,
        }
    }
}

/// Frame-level speech/silence classifier. Not `Send`: keep it on the thread
/// that reads the microphone.
pub struct VadDetector {
    vad: Vad,
    frame_size: usize,
}

impl VadDetector {
    pub fn new(config: &VadConfig) -> VoiceResult<Self> {
        let sample_rate = match config.sample_rate {
            8000 => SampleRate::Rate8kHz,
            16000 => SampleRate::Rate16kHz,
            32000 => SampleRate::Rate32kHz,
            48000 => SampleRate::Rate48kHz,
            other => {
                return Err(VoiceError::VadInit(format!(
                    "WebRTC VAD only supports 8000, 16000, 32000, or 48000 Hz, got {}",
                    other
                )))
            }
        };
        let mode = match config.mode {
            0 => VadMode::Quality,
            1 => VadMode::LowBitrate,
            2 => VadMode::Aggressive,
            3 => VadMode::VeryAggressive,
            other => {
                return Err(VoiceError::VadInit(format!(
                    "VAD mode must be 0-3, got {}",
                    other
                )))
            }
        };

        let mut vad = Vad::new();
        vad.set_mode(mode);
        vad.set_sample_rate(sample_rate);

        Ok(Self {
            vad,
            frame_size: frame_size_for(config.sample_rate),
        })
    }

    /// Classify one 30 ms frame.
    pub fn is_speech(&mut self, frame: &[f32]) -> VoiceResult<bool> {
        if frame.len() != self.frame_size {
            return Err(VoiceError::VadProcessing(format!(
                "Expected {} samples, got {}",
                self.frame_size,
                frame.len()
            )));
        }

        let pcm: Vec<i16> = frame.iter().map(|&s| to_i16(s)).collect();
        let speech = self
            .vad
            .is_voice_segment(&pcm)
            .map_err(|e| VoiceError::VadProcessing(format!("VAD processing failed: {:?}", e)))?;
        debug!(speech, "VAD frame classified");
        Ok(speech)
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}

/// Samples in one 30 ms frame at `sample_rate`.
pub fn frame_size_for(sample_rate: u32) -> usize {
    (sample_rate as usize * 30) / 1000
}

pub(crate) fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}
