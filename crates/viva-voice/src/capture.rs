//! **Speech capture**: one spoken answer in, one transcript out.
//!
//! A [`Recognizer`] reports what it hears as a stream of [`RecognitionEvent`]s.
//! [`SpeechCapture`] folds that stream into a single suspending call: only
//! final results count, interim hypotheses are dropped, and the first
//! non-blank final result ends the capture.

use crate::error::VoiceResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Shown and spoken to the user when nothing usable was recognized.
pub const CAPTURE_APOLOGY: &str = "Sorry, I didn't catch that. Please try again.";

/// What a recognizer reports while listening for one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// The recognizer is now listening.
    Started,
    /// A partial hypothesis. Never returned to callers.
    Interim(String),
    /// A final transcript.
    Final(String),
    /// Recognition failed.
    Error(String),
    /// The recognizer stopped listening.
    Ended,
    /// The input source is closed for good (e.g. end of stdin).
    Exhausted,
}

/// Source of recognition events for one capture.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Begin listening for a single utterance. Dropping the receiver stops it.
    async fn listen(&self) -> VoiceResult<mpsc::Receiver<RecognitionEvent>>;
}

/// Errors returned by [`SpeechCapture::start_capture`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("a capture is already in progress")]
    Busy,

    #[error("no speech was recognized")]
    NoSpeech,

    #[error("speech recognition failed: {0}")]
    Recognition(String),

    #[error("the input source is closed")]
    Exhausted,
}

impl CaptureError {
    /// The fixed user-facing message for recoverable failures.
    pub fn apology(&self) -> Option<&'static str> {
        match self {
            CaptureError::NoSpeech | CaptureError::Recognition(_) => Some(CAPTURE_APOLOGY),
            CaptureError::Busy | CaptureError::Exhausted => None,
        }
    }
}

/// Lifecycle callback fired when capture starts or ends (e.g. to toggle a
/// "recording" indicator).
pub type CaptureHook = Arc<dyn Fn() + Send + Sync>;

/// Runs on every exit from a capture, including cancellation: fires the end
/// hook if listening started, then frees the adapter.
struct CapturingGuard<'a> {
    flag: &'a AtomicBool,
    started: bool,
    on_end: Option<&'a CaptureHook>,
}

impl Drop for CapturingGuard<'_> {
    fn drop(&mut self) {
        if self.started {
            if let Some(hook) = self.on_end {
                hook();
            }
        }
        self.flag.store(false, Ordering::Release);
    }
}

/// The speech capture adapter.
pub struct SpeechCapture {
    recognizer: Arc<dyn Recognizer>,
    capturing: AtomicBool,
    on_capture_start: Option<CaptureHook>,
    on_capture_end: Option<CaptureHook>,
}

impl SpeechCapture {
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            recognizer,
            capturing: AtomicBool::new(false),
            on_capture_start: None,
            on_capture_end: None,
        }
    }

    pub fn on_capture_start(mut self, hook: CaptureHook) -> Self {
        self.on_capture_start = Some(hook);
        self
    }

    pub fn on_capture_end(mut self, hook: CaptureHook) -> Self {
        self.on_capture_end = Some(hook);
        self
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    /// Capture exactly one utterance.
    ///
    /// Rejects the call with [`CaptureError::Busy`] while a previous capture is
    /// outstanding. `on_capture_end` fires once for every capture whose
    /// `on_capture_start` fired, even if this future is dropped mid-capture.
    pub async fn start_capture(&self) -> Result<String, CaptureError> {
        if self
            .capturing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CaptureError::Busy);
        }
        let mut guard = CapturingGuard {
            flag: &self.capturing,
            started: false,
            on_end: self.on_capture_end.as_ref(),
        };

        let mut events = self.recognizer.listen().await.map_err(|e| {
            warn!(error = %e, "Capture: recognizer failed to start");
            CaptureError::Recognition(e.to_string())
        })?;

        loop {
            let Some(event) = events.recv().await else {
                return Err(CaptureError::NoSpeech);
            };
            match event {
                RecognitionEvent::Started => {
                    if !guard.started {
                        guard.started = true;
                        info!("Capture: listening");
                        if let Some(hook) = &self.on_capture_start {
                            hook();
                        }
                    }
                }
                RecognitionEvent::Interim(partial) => {
                    debug!(partial = %partial, "Capture: discarding interim result");
                }
                RecognitionEvent::Final(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        debug!("Capture: ignoring blank final result");
                        continue;
                    }
                    return Ok(text.to_string());
                }
                RecognitionEvent::Error(message) => {
                    warn!(error = %message, "Capture: recognition error");
                    return Err(CaptureError::Recognition(message));
                }
                RecognitionEvent::Ended => return Err(CaptureError::NoSpeech),
                RecognitionEvent::Exhausted => return Err(CaptureError::Exhausted),
            }
        }
    }
}
