//! Local/offline speech used when the remote path fails.
//!
//! Dispatch is fire-and-forget: the synthesizer process is spawned and left
//! to finish on its own. Callers get control back before the audio ends.

use crate::error::{VoiceError, VoiceResult};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Best-effort local text-to-speech.
pub trait LocalSpeech: Send + Sync {
    /// Start speaking `text` and return once the request has been dispatched.
    fn dispatch(&self, text: &str) -> VoiceResult<()>;
}

/// Speaks through an OS command (default `espeak-ng`), passing the text as
/// the final argument.
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `espeak-ng` with an English voice at normal rate.
    pub fn espeak() -> Self {
        Self::new(
            "espeak-ng",
            vec!["-v".into(), "en-us".into(), "-s".into(), "175".into()],
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandSpeech {
    fn default() -> Self {
        Self::espeak()
    }
}

impl LocalSpeech for CommandSpeech {
    fn dispatch(&self, text: &str) -> VoiceResult<()> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                VoiceError::LocalSpeech(format!("Failed to spawn {}: {}", self.program, e))
            })?;
        debug!(program = %self.program, pid = ?child.id(), "local speech dispatched");
        // Dropping the handle detaches the process; tokio reaps it in the background.
        drop(child);
        Ok(())
    }
}

/// Local speech disabled by configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocalSpeech;

impl LocalSpeech for NoLocalSpeech {
    fn dispatch(&self, _text: &str) -> VoiceResult<()> {
        Err(VoiceError::LocalSpeech("local speech is disabled".to_string()))
    }
}
