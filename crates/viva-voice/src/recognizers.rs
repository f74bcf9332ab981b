//! Concrete [`Recognizer`]s: live microphone and typed input.

use crate::capture::{RecognitionEvent, Recognizer};
use crate::error::VoiceResult;
use crate::stt::Transcriber;
use crate::utterance::{record_utterance, UtteranceConfig};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

const EVENT_BUFFER: usize = 8;

/// Listens on the default microphone, waits for one answer, transcribes it.
pub struct MicRecognizer {
    config: UtteranceConfig,
    transcriber: Arc<dyn Transcriber>,
}

impl MicRecognizer {
    pub fn new(config: UtteranceConfig, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            config,
            transcriber,
        }
    }
}

#[async_trait]
impl Recognizer for MicRecognizer {
    async fn listen(&self) -> VoiceResult<mpsc::Receiver<RecognitionEvent>> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let config = self.config.clone();
        let transcriber = Arc::clone(&self.transcriber);

        tokio::spawn(async move {
            let started_tx = tx.clone();
            let recording = tokio::task::spawn_blocking(move || {
                record_utterance(&config, || {
                    let _ = started_tx.blocking_send(RecognitionEvent::Started);
                })
            })
            .await;

            let event = match recording {
                Ok(Ok(Some(utterance))) => {
                    info!(
                        duration_ms = utterance.duration.as_millis() as u64,
                        "Mic: answer recorded, transcribing"
                    );
                    match transcriber.transcribe(&utterance).await {
                        Ok(text) => Some(RecognitionEvent::Final(text)),
                        Err(e) => Some(RecognitionEvent::Error(e.to_string())),
                    }
                }
                Ok(Ok(None)) => {
                    debug!("Mic: no speech before timeout");
                    None
                }
                Ok(Err(e)) => Some(RecognitionEvent::Error(e.to_string())),
                Err(e) => Some(RecognitionEvent::Error(format!("recorder task failed: {}", e))),
            };

            if let Some(event) = event {
                let _ = tx.send(event).await;
            }
            let _ = tx.send(RecognitionEvent::Ended).await;
        });

        Ok(rx)
    }
}

/// Reads one line of typed text per capture. Useful without a microphone and
/// for scripted sessions.
pub struct TextRecognizer<R> {
    lines: Arc<Mutex<Lines<BufReader<R>>>>,
}

impl TextRecognizer<tokio::io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

impl<R> TextRecognizer<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(reader).lines())),
        }
    }
}

#[async_trait]
impl<R> Recognizer for TextRecognizer<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn listen(&self) -> VoiceResult<mpsc::Receiver<RecognitionEvent>> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let lines = Arc::clone(&self.lines);

        tokio::spawn(async move {
            if tx.send(RecognitionEvent::Started).await.is_err() {
                return;
            }
            let next = lines.lock().await.next_line().await;
            let event = match next {
                Ok(Some(line)) => RecognitionEvent::Final(line),
                Ok(None) => RecognitionEvent::Exhausted,
                Err(e) => RecognitionEvent::Error(e.to_string()),
            };
            let _ = tx.send(event).await;
            let _ = tx.send(RecognitionEvent::Ended).await;
        });

        Ok(rx)
    }
}
