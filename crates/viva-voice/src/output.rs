//! **SpeechOutput**: one utterance at a time, remote first, local fallback.
//!
//! ```text
//! speak(text) ──busy?──▶ Busy
//!      │
//!      ▼
//!  synthesize ──err──┐
//!      │             ▼
//!     play ──err──▶ fallback.dispatch ──ok──▶ Degraded
//!      │                    └──────err──────▶ Silent
//!      ▼
//!   Spoken
//! ```

use crate::fallback::LocalSpeech;
use crate::playback::AudioPlayer;
use crate::synthesis::SpeechSynthesizer;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a `speak` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Remote audio was synthesized and played to the end.
    Spoken,
    /// The remote path failed and local speech was dispatched instead.
    Degraded,
    /// Another utterance was in flight; this call did nothing.
    Busy,
    /// Nothing could be spoken (blank text, or the fallback failed too).
    Silent,
}

/// Something that can say a line of text out loud.
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Speak `text`, suspending until the utterance finishes or degrades.
    async fn speak(&self, text: &str) -> SpeechOutcome;

    /// Whether an utterance is currently in flight.
    fn is_speaking(&self) -> bool;
}

/// Releases the busy flag on every exit path, including cancellation.
struct SpeakingGuard<'a>(&'a AtomicBool);

impl Drop for SpeakingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The speech output adapter. Share one instance (behind `Arc`) between every
/// session that talks through the same device.
pub struct SpeechOutput {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    player: Arc<dyn AudioPlayer>,
    fallback: Arc<dyn LocalSpeech>,
    speaking: AtomicBool,
}

impl SpeechOutput {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        player: Arc<dyn AudioPlayer>,
        fallback: Arc<dyn LocalSpeech>,
    ) -> Self {
        Self {
            synthesizer,
            player,
            fallback,
            speaking: AtomicBool::new(false),
        }
    }

    fn fall_back(&self, text: &str) -> SpeechOutcome {
        match self.fallback.dispatch(text) {
            Ok(()) => {
                info!("SpeechOutput: local fallback dispatched");
                SpeechOutcome::Degraded
            }
            Err(e) => {
                warn!(error = %e, "SpeechOutput: local fallback failed, utterance dropped");
                SpeechOutcome::Silent
            }
        }
    }
}

#[async_trait]
impl Speaker for SpeechOutput {
    async fn speak(&self, text: &str) -> SpeechOutcome {
        if self
            .speaking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("SpeechOutput: utterance already in flight, rejecting");
            return SpeechOutcome::Busy;
        }
        let _guard = SpeakingGuard(&self.speaking);

        let text = text.trim();
        if text.is_empty() {
            return SpeechOutcome::Silent;
        }

        let audio = match self.synthesizer.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "SpeechOutput: remote synthesis failed");
                return self.fall_back(text);
            }
        };

        match self.player.play(audio).await {
            Ok(()) => SpeechOutcome::Spoken,
            Err(e) => {
                warn!(error = %e, "SpeechOutput: playback failed");
                self.fall_back(text)
            }
        }
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Acquire)
    }
}
