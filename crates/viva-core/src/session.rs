//! **Conversation session**: the assessment state machine.
//!
//! ```text
//!            submit_utterance (count reaches MAX_QUESTIONS)
//!  Active ───────────────────────────────────────────────▶ Complete
//!    ▲                                                        │
//!    └──────────────────────── restart ───────────────────────┘
//! ```
//!
//! The session is the only writer of its transcript and question counter.
//! It never talks to a device directly: speech goes through the shared
//! [`Speaker`], replies come from the [`CompletionClient`].

use crate::completion::CompletionClient;
use crate::error::{PreconditionViolation, SessionError, SessionResult};
use crate::prompts::{SYSTEM_INSTRUCTION, UPSTREAM_APOLOGY, WELCOME_LINE};
use crate::transcript::{Transcript, Turn};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use viva_voice::{Speaker, SpeechOutcome};

/// Number of examiner questions before the evaluation is due.
pub const MAX_QUESTIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Complete,
}

/// Result of one successful answer/reply round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub reply: String,
    pub question_count: u32,
    pub complete: bool,
    pub speech: SpeechOutcome,
}

pub struct Session {
    id: Uuid,
    transcript: Transcript,
    question_count: u32,
    completion: Arc<dyn CompletionClient>,
    speaker: Arc<dyn Speaker>,
}

impl Session {
    pub fn new(completion: Arc<dyn CompletionClient>, speaker: Arc<dyn Speaker>) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "Session: created");
        Self {
            id,
            transcript: Transcript::seeded(SYSTEM_INSTRUCTION),
            question_count: 0,
            completion,
            speaker,
        }
    }

    /// Announce the welcome line. The transcript is not touched.
    pub async fn start(&self) -> SpeechOutcome {
        info!(session = %self.id, "Session: starting evaluation");
        self.speaker.speak(WELCOME_LINE).await
    }

    /// Record the user's answer, fetch the examiner's reply and speak it.
    ///
    /// Rejected without any state change when the evaluation is complete or
    /// the examiner is still speaking. On upstream failure the user turn is
    /// kept, an apology turn is recorded and spoken, and the counter is left
    /// alone.
    pub async fn submit_utterance(&mut self, text: &str) -> SessionResult<Exchange> {
        if self.is_complete() {
            return Err(PreconditionViolation::SessionComplete.into());
        }
        if self.speaker.is_speaking() {
            return Err(PreconditionViolation::SpeechInFlight.into());
        }

        self.transcript.push_user(text);
        debug!(session = %self.id, turns = self.transcript.len(), "Session: user turn recorded");

        let reply = match self.completion.complete(self.transcript.turns()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session = %self.id, error = %e, "Session: completion failed, apologising");
                self.transcript.push_assistant(UPSTREAM_APOLOGY);
                self.speaker.speak(UPSTREAM_APOLOGY).await;
                return Err(SessionError::Upstream(e));
            }
        };

        self.transcript.push_assistant(reply.clone());
        if reply.contains('?') && self.question_count < MAX_QUESTIONS {
            self.question_count += 1;
        }
        let complete = self.is_complete();
        info!(
            session = %self.id,
            question_count = self.question_count,
            complete,
            "Session: examiner replied"
        );

        let speech = self.speaker.speak(&reply).await;
        Ok(Exchange {
            reply,
            question_count: self.question_count,
            complete,
            speech,
        })
    }

    /// Back to a fresh evaluation: seed turn only, counter zero, welcome again.
    pub async fn restart(&mut self) -> SpeechOutcome {
        self.transcript.truncate_to_seed();
        self.question_count = 0;
        info!(session = %self.id, "Session: restarted");
        self.speaker.speak(WELCOME_LINE).await
    }

    pub fn is_complete(&self) -> bool {
        self.question_count >= MAX_QUESTIONS
    }

    pub fn state(&self) -> SessionState {
        if self.is_complete() {
            SessionState::Complete
        } else {
            SessionState::Active
        }
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    pub fn transcript(&self) -> &[Turn] {
        self.transcript.turns()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}
