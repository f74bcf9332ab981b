//! Utterance gating: deciding when one spoken answer is finished.
//!
//! Waiting → Speaking → Trailing → (gap reached) → complete. A trailing
//! silence of `gap` ends the answer; blips shorter than `min_speech` are
//! dropped and the gate goes back to waiting.

use crate::audio::{AudioConfig, Microphone};
use crate::error::{VoiceError, VoiceResult};
use crate::vad::{frame_size_for, VadConfig, VadDetector};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Timing thresholds for one utterance.
#[derive(Debug, Clone)]
pub struct UtteranceConfig {
    /// Sample rate (default 16000). Must be a WebRTC VAD rate.
    pub sample_rate: u32,
    /// Trailing silence that ends the answer (default 800ms).
    pub gap: Duration,
    /// Speech shorter than this is treated as noise (default 200ms).
    pub min_speech: Duration,
    /// Hard cap on one answer (default 30s).
    pub max_utterance: Duration,
    /// Give up if nobody speaks for this long (default 8s).
    pub no_speech_timeout: Duration,
    /// WebRTC VAD aggressiveness, 0-3 (default 2).
    pub vad_mode: u8,
}

impl Default for UtteranceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            gap: Duration::from_millis(800),
            min_speech: Duration::from_millis(200),
            max_utterance: Duration::from_secs(30),
            no_speech_timeout: Duration::from_secs(8),
            vad_mode: 2,
        }
    }
}

/// A recorded answer, ready for transcription.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// PCM samples (f32, -1.0..1.0), mono.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Time from first speech frame to the last.
    pub duration: Duration,
    pub captured_at: DateTime<Utc>,
}

/// What the gate wants the recorder to do after a frame.
#[derive(Debug)]
pub enum GateDecision {
    Continue,
    Complete(Utterance),
    NoSpeech,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Waiting,
    Speaking,
    Trailing,
}

/// Pure state machine over (is_speech, frame, time) triples.
pub struct UtteranceGate {
    config: UtteranceConfig,
    state: GateState,
    opened_at: Instant,
    speech_start: Option<Instant>,
    last_speech: Option<Instant>,
    buffer: Vec<f32>,
}

impl UtteranceGate {
    pub fn new(config: UtteranceConfig, opened_at: Instant) -> Self {
        Self {
            config,
            state: GateState::Waiting,
            opened_at,
            speech_start: None,
            last_speech: None,
            buffer: Vec::new(),
        }
    }

    pub fn feed(&mut self, is_speech: bool, frame: &[f32], now: Instant) -> GateDecision {
        match (self.state, is_speech) {
            (GateState::Waiting, true) => {
                debug!("Gate: speech started");
                self.state = GateState::Speaking;
                self.speech_start = Some(now);
                self.last_speech = Some(now);
                self.buffer.clear();
                self.buffer.extend_from_slice(frame);
            }
            (GateState::Waiting, false) => {
                if now.duration_since(self.opened_at) >= self.config.no_speech_timeout {
                    return GateDecision::NoSpeech;
                }
            }
            (GateState::Speaking, true) | (GateState::Trailing, true) => {
                self.state = GateState::Speaking;
                self.last_speech = Some(now);
                self.buffer.extend_from_slice(frame);
                if self.speech_elapsed(now) >= self.config.max_utterance {
                    info!("Gate: maximum answer length reached");
                    return self.complete(now);
                }
            }
            (GateState::Speaking, false) => {
                self.state = GateState::Trailing;
                self.buffer.extend_from_slice(frame);
            }
            (GateState::Trailing, false) => {
                self.buffer.extend_from_slice(frame);
                let last = self.last_speech.unwrap_or(now);
                if now.duration_since(last) >= self.config.gap {
                    let spoken = last.duration_since(self.speech_start.unwrap_or(last));
                    if spoken < self.config.min_speech {
                        debug!(?spoken, "Gate: speech too short, ignoring");
                        self.reset(now);
                    } else {
                        return self.complete(now);
                    }
                }
            }
        }
        GateDecision::Continue
    }

    fn speech_elapsed(&self, now: Instant) -> Duration {
        self.speech_start
            .map(|start| now.duration_since(start))
            .unwrap_or_default()
    }

    fn complete(&mut self, now: Instant) -> GateDecision {
        let last = self.last_speech.unwrap_or(now);
        let duration = last.duration_since(self.speech_start.unwrap_or(last));
        let samples = std::mem::take(&mut self.buffer);
        self.reset(now);
        GateDecision::Complete(Utterance {
            samples,
            sample_rate: self.config.sample_rate,
            duration,
            captured_at: Utc::now(),
        })
    }

    /// Back to waiting. The no-speech clock restarts so a dropped blip does
    /// not eat into the user's time.
    fn reset(&mut self, now: Instant) {
        self.state = GateState::Waiting;
        self.opened_at = now;
        self.speech_start = None;
        self.last_speech = None;
        self.buffer.clear();
    }
}

/// Record one answer from the default microphone. Blocking: run it on a
/// blocking thread.
///
/// `on_listening` fires once the input stream is live. Returns `Ok(None)`
/// when nobody spoke before the no-speech timeout.
pub fn record_utterance(
    config: &UtteranceConfig,
    on_listening: impl FnOnce(),
) -> VoiceResult<Option<Utterance>> {
    let frame_size = frame_size_for(config.sample_rate);
    let mut vad = VadDetector::new(&VadConfig {
        sample_rate: config.sample_rate,
        mode: config.vad_mode,
    })?;

    let microphone = Microphone::open(AudioConfig {
        sample_rate: config.sample_rate,
        channels: 1,
        frame_size,
    })?;
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
    let stream = microphone.start(frame_tx)?;
    on_listening();

    let mut gate = UtteranceGate::new(config.clone(), Instant::now());
    let outcome = loop {
        let Some(frame) = frame_rx.blocking_recv() else {
            break Err(VoiceError::AudioStream(
                "microphone stream closed unexpectedly".to_string(),
            ));
        };
        if frame.samples.len() != vad.frame_size() {
            continue;
        }
        let is_speech = match vad.is_speech(&frame.samples) {
            Ok(speech) => speech,
            Err(e) => {
                debug!(error = %e, "Recorder: skipping frame");
                continue;
            }
        };
        match gate.feed(is_speech, &frame.samples, frame.captured_at) {
            GateDecision::Continue => {}
            GateDecision::Complete(utterance) => break Ok(Some(utterance)),
            GateDecision::NoSpeech => break Ok(None),
        }
    };
    drop(stream);
    outcome
}
