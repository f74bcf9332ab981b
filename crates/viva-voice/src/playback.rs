//! Audio playback of synthesized speech using Rodio.
//!
//! The Rodio output stream is not `Send` on every platform, so it lives on a
//! dedicated thread for the lifetime of the player. Async callers submit a
//! job and are woken once the sink has drained.

use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use rodio::{OutputStream, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc as std_mpsc;
use std::sync::Mutex;
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Plays one encoded audio clip and resolves when playback has ended.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, audio: Vec<u8>) -> VoiceResult<()>;
}

struct PlayJob {
    audio: Vec<u8>,
    done: oneshot::Sender<VoiceResult<()>>,
}

/// Plays audio on the default output device.
pub struct RodioPlayer {
    jobs: Mutex<std_mpsc::Sender<PlayJob>>,
}

impl RodioPlayer {
    /// Open the default output device on a playback thread.
    ///
    /// Fails if no output device is available.
    pub fn spawn() -> VoiceResult<Self> {
        let (job_tx, job_rx) = std_mpsc::channel::<PlayJob>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<VoiceResult<()>>();

        thread::Builder::new()
            .name("viva-playback".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => {
                        let _ = ready_tx.send(Ok(()));
                        pair
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(VoiceError::Playback(e.to_string())));
                        return;
                    }
                };
                info!("Playback: output device ready");

                while let Ok(job) = job_rx.recv() {
                    let result = play_blocking(&handle, job.audio);
                    let _ = job.done.send(result);
                }
                debug!("Playback: job channel closed, releasing output device");
            })?;

        ready_rx
            .recv()
            .map_err(|_| VoiceError::Playback("playback thread exited during start-up".to_string()))??;

        Ok(Self {
            jobs: Mutex::new(job_tx),
        })
    }
}

fn play_blocking(handle: &rodio::OutputStreamHandle, audio: Vec<u8>) -> VoiceResult<()> {
    if audio.is_empty() {
        return Ok(());
    }
    let sink = Sink::try_new(handle).map_err(|e| VoiceError::Playback(e.to_string()))?;
    let source = rodio::Decoder::new(Cursor::new(audio))
        .map_err(|e| VoiceError::Playback(format!("Decode failed: {}", e)))?;
    sink.append(source.convert_samples::<f32>());
    sink.sleep_until_end();
    Ok(())
}

#[async_trait]
impl AudioPlayer for RodioPlayer {
    async fn play(&self, audio: Vec<u8>) -> VoiceResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        {
            let jobs = self
                .jobs
                .lock()
                .map_err(|_| VoiceError::Playback("playback queue poisoned".to_string()))?;
            jobs.send(PlayJob {
                audio,
                done: done_tx,
            })
            .map_err(|_| VoiceError::Playback("playback thread is gone".to_string()))?;
        }
        done_rx.await.map_err(|_| {
            warn!("Playback: thread dropped the job before finishing");
            VoiceError::Playback("playback thread dropped the job".to_string())
        })?
    }
}

/// Player for hosts without an output device. Every clip fails to start,
/// which routes speech to the local fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlayer;

#[async_trait]
impl AudioPlayer for NullPlayer {
    async fn play(&self, _audio: Vec<u8>) -> VoiceResult<()> {
        Err(VoiceError::Playback("no audio output device".to_string()))
    }
}
