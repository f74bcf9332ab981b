//! # Viva Core - the spoken English evaluation
//!
//! A [`Session`] owns the [`Transcript`] and the question counter, asks a
//! [`CompletionClient`] for each examiner reply and speaks it through a shared
//! [`viva_voice::Speaker`]. After [`MAX_QUESTIONS`] questions the session is
//! complete until restarted.

pub mod completion;
pub mod config;
pub mod error;
pub mod prompts;
pub mod session;
pub mod transcript;

pub use completion::{CompletionClient, GenerationParams, OpenAiCompletion};
pub use crate::config::{CaptureMode, CaptureSettings, CompletionSettings, SpeechSettings, VivaConfig};
pub use error::{PreconditionViolation, SessionError, SessionResult, UpstreamError};
pub use prompts::{SYSTEM_INSTRUCTION, UPSTREAM_APOLOGY, WELCOME_LINE};
pub use session::{Exchange, Session, SessionState, MAX_QUESTIONS};
pub use transcript::{Role, Transcript, Turn};
