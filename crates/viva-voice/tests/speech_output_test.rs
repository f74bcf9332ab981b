//! Integration tests for SpeechOutput: one utterance at a time, remote first,
//! local fallback when synthesis or playback fails.
//!
//! ## Scenarios
//! 1. A second speak while one is in flight is rejected as Busy.
//! 2. Synthesis failure dispatches the fallback exactly once and frees the adapter.
//! 3. Playback failure dispatches the fallback.
//! 4. Both paths failing leaves the utterance Silent.
//! 5. Blank text is never sent anywhere.
//! 6. Cancelling an utterance mid-playback frees the adapter.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use viva_voice::{
    AudioPlayer, LocalSpeech, Speaker, SpeechOutcome, SpeechOutput, SpeechSynthesizer,
    VoiceError, VoiceResult,
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeSynth {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for FakeSynth {
    async fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(VoiceError::Tts("quota exceeded".to_string()))
        } else {
            Ok(text.as_bytes().to_vec())
        }
    }
}

/// Player that holds each utterance until the test releases it.
#[derive(Default)]
struct GatedPlayer {
    started: Notify,
    release: Notify,
    plays: AtomicUsize,
}

#[async_trait]
impl AudioPlayer for GatedPlayer {
    async fn play(&self, _audio: Vec<u8>) -> VoiceResult<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[derive(Default)]
struct InstantPlayer {
    fail: bool,
    plays: AtomicUsize,
}

#[async_trait]
impl AudioPlayer for InstantPlayer {
    async fn play(&self, _audio: Vec<u8>) -> VoiceResult<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(VoiceError::Playback("device unplugged".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
struct RecordingFallback {
    fail: bool,
    spoken: Mutex<Vec<String>>,
}

impl RecordingFallback {
    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl LocalSpeech for RecordingFallback {
    fn dispatch(&self, text: &str) -> VoiceResult<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            Err(VoiceError::LocalSpeech("espeak-ng not installed".to_string()))
        } else {
            Ok(())
        }
    }
}

fn output(
    synth: &Arc<FakeSynth>,
    player: Arc<dyn AudioPlayer>,
    fallback: &Arc<RecordingFallback>,
) -> SpeechOutput {
    SpeechOutput::new(synth.clone(), player, fallback.clone())
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_speak_while_playing_is_rejected() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let synth = Arc::new(FakeSynth::default());
    let player = Arc::new(GatedPlayer::default());
    let fallback = Arc::new(RecordingFallback::default());
    let speech = Arc::new(output(&synth, player.clone(), &fallback));

    let first = {
        let speech = speech.clone();
        tokio::spawn(async move { speech.speak("What do you do for a living?").await })
    };
    tokio::time::timeout(Duration::from_secs(2), player.started.notified())
        .await
        .expect("first utterance never reached the player");

    assert!(speech.is_speaking());
    assert_eq!(speech.speak("Interrupting line").await, SpeechOutcome::Busy);

    player.release.notify_one();
    let outcome = first.await.unwrap();

    assert_eq!(outcome, SpeechOutcome::Spoken);
    assert_eq!(player.plays.load(Ordering::SeqCst), 1);
    assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    assert!(!speech.is_speaking());
    assert!(fallback.spoken().is_empty());
}

#[tokio::test]
async fn synthesis_failure_falls_back_once_and_frees_adapter() {
    let synth = Arc::new(FakeSynth {
        fail: true,
        ..Default::default()
    });
    let player = Arc::new(InstantPlayer::default());
    let fallback = Arc::new(RecordingFallback::default());
    let speech = output(&synth, player.clone(), &fallback);

    let outcome = speech.speak("Tell me about your hometown.").await;

    assert_eq!(outcome, SpeechOutcome::Degraded);
    assert_eq!(fallback.spoken(), vec!["Tell me about your hometown.".to_string()]);
    assert_eq!(player.plays.load(Ordering::SeqCst), 0);
    assert!(!speech.is_speaking());

    // Adapter is free again: the next utterance is attempted immediately.
    let again = speech.speak("Next question.").await;
    assert_eq!(again, SpeechOutcome::Degraded);
    assert_eq!(synth.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn playback_failure_falls_back() {
    let synth = Arc::new(FakeSynth::default());
    let player = Arc::new(InstantPlayer {
        fail: true,
        ..Default::default()
    });
    let fallback = Arc::new(RecordingFallback::default());
    let speech = output(&synth, player.clone(), &fallback);

    assert_eq!(speech.speak("Hello").await, SpeechOutcome::Degraded);
    assert_eq!(player.plays.load(Ordering::SeqCst), 1);
    assert_eq!(fallback.spoken(), vec!["Hello".to_string()]);
}

#[tokio::test]
async fn both_paths_failing_is_silent_and_releases_flag() {
    let synth = Arc::new(FakeSynth {
        fail: true,
        ..Default::default()
    });
    let player = Arc::new(InstantPlayer::default());
    let fallback = Arc::new(RecordingFallback {
        fail: true,
        ..Default::default()
    });
    let speech = output(&synth, player, &fallback);

    assert_eq!(speech.speak("Hello").await, SpeechOutcome::Silent);
    assert!(!speech.is_speaking());
    assert_eq!(fallback.spoken().len(), 1);
}

#[tokio::test]
async fn blank_text_is_silent_without_side_effects() {
    let synth = Arc::new(FakeSynth::default());
    let player = Arc::new(InstantPlayer::default());
    let fallback = Arc::new(RecordingFallback::default());
    let speech = output(&synth, player.clone(), &fallback);

    assert_eq!(speech.speak("   \n").await, SpeechOutcome::Silent);
    assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    assert_eq!(player.plays.load(Ordering::SeqCst), 0);
    assert!(fallback.spoken().is_empty());
}

#[tokio::test]
async fn cancelled_speak_releases_flag() {
    let synth = Arc::new(FakeSynth::default());
    let player = Arc::new(GatedPlayer::default());
    let fallback = Arc::new(RecordingFallback::default());
    let speech = Arc::new(output(&synth, player.clone(), &fallback));

    let pending = {
        let speech = speech.clone();
        tokio::spawn(async move { speech.speak("Describe your favourite book.").await })
    };
    tokio::time::timeout(Duration::from_secs(2), player.started.notified())
        .await
        .expect("utterance never reached the player");
    assert!(speech.is_speaking());

    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());
    assert!(!speech.is_speaking());

    // Stored permit lets the next play finish straight away.
    player.release.notify_one();
    assert_eq!(speech.speak("Next question.").await, SpeechOutcome::Spoken);
    assert_eq!(player.plays.load(Ordering::SeqCst), 2);
    assert!(fallback.spoken().is_empty());
}
