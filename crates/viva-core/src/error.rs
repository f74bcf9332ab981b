//! Error kinds surfaced by the assessment core.

use thiserror::Error;

/// The completion service failed to produce a reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("completion request timed out")]
    Timeout,

    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("completion service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed completion response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_decode() {
            UpstreamError::Malformed(e.to_string())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

/// A session operation was invoked in a state that does not allow it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionViolation {
    #[error("the evaluation is complete; restart to begin again")]
    SessionComplete,

    #[error("the examiner is still speaking")]
    SpeechInFlight,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),

    /// The apology turn has already been recorded and spoken.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

pub type SessionResult<T> = Result<T, SessionError>;
