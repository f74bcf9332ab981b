//! Microphone input using CPAL.
//!
//! Samples are regrouped into fixed-size frames before they leave the audio
//! callback, since the VAD only accepts 10/20/30 ms frames.

use crate::error::{VoiceError, VoiceResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Microphone configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 16000)
    pub sample_rate: u32,

    /// Number of channels (default: 1 for mono)
    pub channels: u16,

    /// Frame size in samples (default: 480 for 30ms at 16kHz)
    pub frame_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_size: 480,
        }
    }
}

/// One frame of microphone samples (f32, -1.0..1.0).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub captured_at: Instant,
}

/// Microphone handle for the default input device.
pub struct Microphone {
    config: AudioConfig,
    device: Device,
    stream_config: StreamConfig,
}

impl Microphone {
    pub fn open(config: AudioConfig) -> VoiceResult<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| VoiceError::AudioDevice("No input device available".to_string()))?;

        info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate = config.sample_rate,
            "Microphone: opened input device"
        );

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            config,
            device,
            stream_config,
        })
    }

    /// Start streaming frames into `frame_tx`. Audio flows until the returned
    /// stream is dropped.
    pub fn start(self, frame_tx: mpsc::UnboundedSender<AudioFrame>) -> VoiceResult<Stream> {
        let frame_size = self.config.frame_size;
        let channels = usize::from(self.config.channels.max(1));
        let mut pending = Vec::with_capacity(frame_size);

        let stream = self.device.build_input_stream(
            &self.stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Downmix by taking the first channel of each interleaved frame.
                for &sample in data.iter().step_by(channels) {
                    pending.push(sample);
                    if pending.len() == frame_size {
                        let frame = AudioFrame {
                            samples: std::mem::replace(&mut pending, Vec::with_capacity(frame_size)),
                            captured_at: Instant::now(),
                        };
                        if frame_tx.send(frame).is_err() {
                            return;
                        }
                    }
                }
            },
            move |err| {
                warn!("Microphone stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        Ok(stream)
    }

    /// List available input devices
    pub fn list_input_devices() -> VoiceResult<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices()?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}
