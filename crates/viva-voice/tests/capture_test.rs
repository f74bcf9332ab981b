//! Integration tests for SpeechCapture folding recognizer events into one answer.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_test::{assert_err, assert_ok};
use viva_voice::{
    CaptureError, RecognitionEvent, Recognizer, SpeechCapture, TextRecognizer, VoiceError,
    VoiceResult,
};

use RecognitionEvent::*;

/// Replays one canned event script per `listen` call.
struct ScriptedRecognizer {
    scripts: Mutex<VecDeque<Vec<RecognitionEvent>>>,
}

impl ScriptedRecognizer {
    fn new(scripts: Vec<Vec<RecognitionEvent>>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
        })
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn listen(&self) -> VoiceResult<mpsc::Receiver<RecognitionEvent>> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| VoiceError::Stt("no script left".to_string()))?;
        let (tx, rx) = mpsc::channel(script.len().max(1));
        for event in script {
            tx.send(event).await.unwrap();
        }
        Ok(rx)
    }
}

/// Says it started listening, then never hears anything.
#[derive(Default)]
struct SilentRecognizer {
    held: Mutex<Vec<mpsc::Sender<RecognitionEvent>>>,
}

#[async_trait]
impl Recognizer for SilentRecognizer {
    async fn listen(&self) -> VoiceResult<mpsc::Receiver<RecognitionEvent>> {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Started).await.unwrap();
        self.held.lock().unwrap().push(tx);
        Ok(rx)
    }
}

fn counting_hooks(capture: SpeechCapture) -> (SpeechCapture, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let starts = Arc::new(AtomicUsize::new(0));
    let ends = Arc::new(AtomicUsize::new(0));
    let (s, e) = (starts.clone(), ends.clone());
    let capture = capture
        .on_capture_start(Arc::new(move || {
            s.fetch_add(1, Ordering::SeqCst);
        }))
        .on_capture_end(Arc::new(move || {
            e.fetch_add(1, Ordering::SeqCst);
        }));
    (capture, starts, ends)
}

#[tokio::test]
async fn interim_results_are_discarded() {
    let recognizer = ScriptedRecognizer::new(vec![vec![
        Started,
        Interim("I work".into()),
        Interim("I work as a".into()),
        Final("  I work as a nurse  ".into()),
        Ended,
    ]]);
    let capture = SpeechCapture::new(recognizer);

    let text = assert_ok!(capture.start_capture().await);
    assert_eq!(text, "I work as a nurse");
    assert!(!capture.is_capturing());
}

#[tokio::test]
async fn hooks_fire_once_per_capture() {
    let recognizer = ScriptedRecognizer::new(vec![
        vec![Started, Started, Final("yes".into())],
        vec![Started, Error("network".into())],
    ]);
    let (capture, starts, ends) = counting_hooks(SpeechCapture::new(recognizer));

    assert_ok!(capture.start_capture().await);
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(ends.load(Ordering::SeqCst), 1);

    assert_err!(capture.start_capture().await);
    assert_eq!(starts.load(Ordering::SeqCst), 2);
    assert_eq!(ends.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn end_hook_skipped_when_listening_never_started() {
    let recognizer = ScriptedRecognizer::new(vec![]);
    let (capture, starts, ends) = counting_hooks(SpeechCapture::new(recognizer));

    let err = capture.start_capture().await.unwrap_err();
    assert!(matches!(err, CaptureError::Recognition(_)));
    assert_eq!(starts.load(Ordering::SeqCst), 0);
    assert_eq!(ends.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn recognizer_outcomes_map_to_capture_errors() {
    let recognizer = ScriptedRecognizer::new(vec![
        vec![Started, Error("not-allowed".into()), Ended],
        vec![Started, Final("   ".into()), Ended],
        vec![Started],
        vec![Started, Exhausted],
    ]);
    let capture = SpeechCapture::new(recognizer);

    assert_eq!(
        capture.start_capture().await,
        Err(CaptureError::Recognition("not-allowed".into()))
    );
    assert_eq!(capture.start_capture().await, Err(CaptureError::NoSpeech));
    assert_eq!(capture.start_capture().await, Err(CaptureError::NoSpeech));
    assert_eq!(capture.start_capture().await, Err(CaptureError::Exhausted));
}

#[tokio::test]
async fn overlapping_capture_is_rejected() {
    let listening = Arc::new(Notify::new());
    let signal = listening.clone();
    let capture = Arc::new(
        SpeechCapture::new(Arc::new(SilentRecognizer::default()))
            .on_capture_start(Arc::new(move || signal.notify_one())),
    );

    let pending = {
        let capture = capture.clone();
        tokio::spawn(async move { capture.start_capture().await })
    };
    tokio::time::timeout(Duration::from_secs(2), listening.notified())
        .await
        .expect("capture never started listening");

    assert!(capture.is_capturing());
    assert_eq!(capture.start_capture().await, Err(CaptureError::Busy));

    pending.abort();
    let _ = pending.await;
    assert!(!capture.is_capturing());
}

#[tokio::test]
async fn aborted_capture_still_fires_end_hook() {
    let listening = Arc::new(Notify::new());
    let signal = listening.clone();
    let starts = Arc::new(AtomicUsize::new(0));
    let ends = Arc::new(AtomicUsize::new(0));
    let (s, e) = (starts.clone(), ends.clone());
    let capture = Arc::new(
        SpeechCapture::new(Arc::new(SilentRecognizer::default()))
            .on_capture_start(Arc::new(move || {
                s.fetch_add(1, Ordering::SeqCst);
                signal.notify_one();
            }))
            .on_capture_end(Arc::new(move || {
                e.fetch_add(1, Ordering::SeqCst);
            })),
    );

    let pending = {
        let capture = capture.clone();
        tokio::spawn(async move { capture.start_capture().await })
    };
    tokio::time::timeout(Duration::from_secs(2), listening.notified())
        .await
        .expect("capture never started listening");
    assert_eq!(ends.load(Ordering::SeqCst), 0);

    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());

    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(ends.load(Ordering::SeqCst), 1);
    assert!(!capture.is_capturing());
}

#[tokio::test]
async fn text_recognizer_reads_one_line_per_capture() {
    let input = Cursor::new(b"I am a software engineer\n\nI enjoy hiking\n".to_vec());
    let capture = SpeechCapture::new(Arc::new(TextRecognizer::new(input)));

    assert_eq!(
        capture.start_capture().await,
        Ok("I am a software engineer".to_string())
    );
    assert_eq!(capture.start_capture().await, Err(CaptureError::NoSpeech));
    assert_eq!(capture.start_capture().await, Ok("I enjoy hiking".to_string()));
    assert_eq!(capture.start_capture().await, Err(CaptureError::Exhausted));
}
