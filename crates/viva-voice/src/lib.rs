//! # Viva Voice - speech adapters for the spoken assessment
//!
//! Everything the examiner says goes through [`SpeechOutput`]; everything the
//! candidate says comes back through [`SpeechCapture`]. Both adapters admit a
//! single operation at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────── SpeechOutput ──────────────────────────┐
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐    │
//! │  │  OpenAiTts   │ → │ RodioPlayer  │   │  CommandSpeech   │    │
//! │  │ (/audio/     │   │   (rodio)    │   │  (espeak-ng)     │    │
//! │  │   speech)    │   └──────────────┘   └──────────────────┘    │
//! │  └──────────────┘          └── on failure ──────┘              │
//! └─────────────────────────────────────────────────────────────────┘
//! ┌───────────────────────── SpeechCapture ─────────────────────────┐
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐    │
//! │  │  Microphone  │ → │  WebRTC VAD  │ → │ UtteranceGate    │    │
//! │  │    (cpal)    │   │              │   │  (800ms gap)     │    │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘    │
//! │                                                 ↓               │
//! │                     ┌──────────────────────────────────────┐   │
//! │                     │ OpenAiTranscriber (/audio/transcr.)  │   │
//! │                     └──────────────────────────────────────┘   │
//! │       or TextRecognizer (one typed line per answer)             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod capture;
pub mod error;
pub mod fallback;
pub mod output;
pub mod playback;
pub mod recognizers;
pub mod stt;
pub mod synthesis;
pub mod utterance;
pub mod vad;

pub use audio::{AudioConfig, AudioFrame, Microphone};
pub use capture::{
    CaptureError, CaptureHook, RecognitionEvent, Recognizer, SpeechCapture, CAPTURE_APOLOGY,
};
pub use error::{VoiceError, VoiceResult};
pub use fallback::{CommandSpeech, LocalSpeech, NoLocalSpeech};
pub use output::{Speaker, SpeechOutcome, SpeechOutput};
pub use playback::{AudioPlayer, NullPlayer, RodioPlayer};
pub use recognizers::{MicRecognizer, TextRecognizer};
pub use stt::{encode_wav, OpenAiTranscriber, Transcriber};
pub use synthesis::{OpenAiTts, SpeechSynthesizer, UnconfiguredSynthesizer, Voice};
pub use utterance::{record_utterance, GateDecision, Utterance, UtteranceConfig, UtteranceGate};
pub use vad::{VadConfig, VadDetector};
