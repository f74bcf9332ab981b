//! Viva terminal front-end
//!
//! Runs one spoken English evaluation: the examiner speaks, the candidate
//! answers by microphone (or by typing), and after five questions the
//! examiner delivers a CEFR evaluation. The conversation is printed to
//! stdout; logs go to stderr.

use anyhow::{anyhow, Context};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use viva_core::{
    CaptureMode, OpenAiCompletion, Session, SessionError, VivaConfig, UPSTREAM_APOLOGY,
    WELCOME_LINE,
};
use viva_voice::{
    AudioPlayer, CaptureError, CommandSpeech, LocalSpeech, MicRecognizer, Microphone,
    NoLocalSpeech, NullPlayer, OpenAiTranscriber, OpenAiTts, Recognizer, RodioPlayer, Speaker, SpeechCapture,
    SpeechOutput, SpeechSynthesizer, TextRecognizer, UnconfiguredSynthesizer,
};

const RESTART_COMMAND: &str = "restart";

/// What the candidate asked for once the evaluation has been delivered.
#[derive(Debug, PartialEq, Eq)]
enum AfterEvaluation {
    Restart,
    Quit,
    /// Nothing usable was heard; ask again, apologising if there is a reason to.
    Retry(Option<&'static str>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[viva] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = VivaConfig::load().context("loading configuration")?;
    info!(?config, "Viva starting");

    let speaker = Arc::new(build_speaker(&config)?);
    let (recognizer, mode) = build_recognizer(&config)?;
    let capture = SpeechCapture::new(recognizer).on_capture_start(Arc::new(move || {
        match mode {
            CaptureMode::Microphone => println!("(listening...)"),
            CaptureMode::Keyboard => {
                print!("> ");
                let _ = std::io::stdout().flush();
            }
        }
    }));

    let api_key = config.completion.api_key.clone().ok_or_else(|| {
        anyhow!("no completion API key: set OPENAI_API_KEY or VIVA_COMPLETION__API_KEY")
    })?;
    let completion = OpenAiCompletion::new(api_key, config.completion.timeout())?
        .with_base_url(&config.completion.base_url)
        .with_model(&config.completion.model)
        .with_params(config.completion.params());

    let mut session = Session::new(Arc::new(completion), speaker.clone());

    tokio::select! {
        result = run(&mut session, &capture, speaker.as_ref()) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("CTRL-C received; ending evaluation");
            Ok(())
        }
    }
}

async fn run(
    session: &mut Session,
    capture: &SpeechCapture,
    speaker: &dyn Speaker,
) -> anyhow::Result<()> {
    say("Examiner", WELCOME_LINE);
    session.start().await;

    loop {
        if session.is_complete() {
            println!("\nEvaluation complete. Say or type \"restart\" to begin again; anything else quits.");
            match after_evaluation(&capture.start_capture().await) {
                AfterEvaluation::Restart => {
                    say("Examiner", WELCOME_LINE);
                    session.restart().await;
                }
                AfterEvaluation::Retry(apology) => {
                    if let Some(apology) = apology {
                        say("Examiner", apology);
                        speaker.speak(apology).await;
                    }
                }
                AfterEvaluation::Quit => break,
            }
            continue;
        }

        let text = match capture.start_capture().await {
            Ok(text) => text,
            Err(CaptureError::Exhausted) => {
                info!("Input closed; ending evaluation");
                break;
            }
            Err(e) => {
                if let Some(apology) = e.apology() {
                    say("Examiner", apology);
                    speaker.speak(apology).await;
                }
                continue;
            }
        };

        if is_restart(&text) {
            say("Examiner", WELCOME_LINE);
            session.restart().await;
            continue;
        }

        say("You", &text);
        match session.submit_utterance(&text).await {
            Ok(exchange) => {
                say("Examiner", &exchange.reply);
                info!(
                    question_count = exchange.question_count,
                    speech = ?exchange.speech,
                    "Exchange finished"
                );
            }
            Err(SessionError::Upstream(e)) => {
                warn!(error = %e, "Examiner reply failed");
                say("Examiner", UPSTREAM_APOLOGY);
            }
            Err(SessionError::Precondition(v)) => {
                warn!(reason = %v, "Answer not accepted");
            }
        }
    }

    info!(session = %session.id(), "Evaluation ended");
    Ok(())
}

fn build_speaker(config: &VivaConfig) -> anyhow::Result<SpeechOutput> {
    let speech = &config.speech;
    let synthesizer: Arc<dyn SpeechSynthesizer> = match &speech.api_key {
        Some(key) => Arc::new(
            OpenAiTts::new(&speech.base_url, key, &speech.model, speech.timeout())?
                .with_voice(speech.voice),
        ),
        None => {
            warn!("No speech API key configured; using local speech only");
            Arc::new(UnconfiguredSynthesizer)
        }
    };

    let player: Arc<dyn AudioPlayer> = match RodioPlayer::spawn() {
        Ok(player) => Arc::new(player),
        Err(e) => {
            warn!(error = %e, "No audio output device; using local speech only");
            Arc::new(NullPlayer)
        }
    };

    let fallback: Arc<dyn LocalSpeech> = if speech.fallback_program.trim().is_empty() {
        Arc::new(NoLocalSpeech)
    } else {
        Arc::new(CommandSpeech::new(
            speech.fallback_program.clone(),
            speech.fallback_args.clone(),
        ))
    };

    Ok(SpeechOutput::new(synthesizer, player, fallback))
}

fn build_recognizer(config: &VivaConfig) -> anyhow::Result<(Arc<dyn Recognizer>, CaptureMode)> {
    let capture = &config.capture;
    let recognizer: Arc<dyn Recognizer> = match (capture.mode, &capture.api_key) {
        (CaptureMode::Microphone, Some(key)) => {
            match Microphone::list_input_devices() {
                Ok(devices) => info!(?devices, "Input devices"),
                Err(e) => warn!(error = %e, "Could not list input devices"),
            }
            let transcriber = OpenAiTranscriber::new(
                &capture.base_url,
                key,
                &capture.transcription_model,
                capture.timeout(),
            )?
            .with_language(&capture.language);
            let recognizer: Arc<dyn Recognizer> =
                Arc::new(MicRecognizer::new(capture.utterance(), Arc::new(transcriber)));
            return Ok((recognizer, CaptureMode::Microphone));
        }
        (CaptureMode::Microphone, None) => {
            warn!("No transcription API key configured; answers will be typed");
            Arc::new(TextRecognizer::stdin())
        }
        (CaptureMode::Keyboard, _) => Arc::new(TextRecognizer::stdin()),
    };
    Ok((recognizer, CaptureMode::Keyboard))
}

/// Print one line of the conversation with a local timestamp.
fn say(speaker: &str, text: &str) {
    println!("[{}] {}: {}", chrono::Local::now().format("%H:%M"), speaker, text);
}

/// Only an explicit answer other than "restart", or closed input, ends the
/// program after the evaluation.
fn after_evaluation(result: &Result<String, CaptureError>) -> AfterEvaluation {
    match result {
        Ok(text) if is_restart(text) => AfterEvaluation::Restart,
        Ok(_) | Err(CaptureError::Exhausted) => AfterEvaluation::Quit,
        Err(e) => AfterEvaluation::Retry(e.apology()),
    }
}

/// "Restart", "restart." and " RESTART! " all count.
fn is_restart(text: &str) -> bool {
    text.trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .eq_ignore_ascii_case(RESTART_COMMAND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_command_tolerates_case_and_punctuation() {
        assert!(is_restart("restart"));
        assert!(is_restart(" Restart. "));
        assert!(is_restart("RESTART!"));
        assert!(!is_restart("please restart the test"));
        assert!(!is_restart(""));
    }

    #[test]
    fn failed_capture_after_evaluation_asks_again() {
        assert_eq!(
            after_evaluation(&Ok("Restart.".to_string())),
            AfterEvaluation::Restart
        );
        assert_eq!(
            after_evaluation(&Ok("no thanks".to_string())),
            AfterEvaluation::Quit
        );
        assert_eq!(
            after_evaluation(&Err(CaptureError::Exhausted)),
            AfterEvaluation::Quit
        );
        assert_eq!(
            after_evaluation(&Err(CaptureError::NoSpeech)),
            AfterEvaluation::Retry(CaptureError::NoSpeech.apology())
        );
        assert_eq!(
            after_evaluation(&Err(CaptureError::Recognition("network".into()))),
            AfterEvaluation::Retry(CaptureError::NoSpeech.apology())
        );
        assert_eq!(
            after_evaluation(&Err(CaptureError::Busy)),
            AfterEvaluation::Retry(None)
        );
    }
}
