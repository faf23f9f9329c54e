//! Live microphone [`AudioSource`], grounded in the teacher's `cpal`-backed
//! `coldvox-audio::capture` device handling but scoped down to what a demo
//! CLI needs: one default input device, downmixed to mono and resampled to
//! the engine's sample rate with a small linear resampler (the quality-tier
//! `rubato` path belongs to a production audio pipeline, not this demo).

use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{InputCallbackInfo, SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use voxstream_audio::AudioSource;
use voxstream_foundation::error::{HostError, StreamError};

const TARGET_SAMPLE_RATE_HZ: u32 = voxstream_audio::SAMPLE_RATE_HZ;
const RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Reads from the system's default audio input device. `read` blocks for up
/// to [`RECV_TIMEOUT`] per underlying device callback so a session-stop
/// check elsewhere in the scheduler is never starved for more than that.
pub struct MicSource {
    _stream: cpal::Stream,
    rx: Receiver<Vec<f32>>,
    device_rate: u32,
    channels: u16,
    pending: Vec<f32>,
    disconnected: bool,
}

impl MicSource {
    pub fn default_device() -> Result<Self, StreamError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            StreamError::Host(HostError::InvalidAudio("no default input device".to_string()))
        })?;
        let supported = device.default_input_config().map_err(|e| {
            StreamError::Host(HostError::InvalidAudio(format!("no usable input config: {e}")))
        })?;

        let device_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        let (tx, rx) = bounded::<Vec<f32>>(64);
        let stream = build_stream(&device, &config, sample_format, tx)?;
        stream.play().map_err(|e| {
            StreamError::Host(HostError::InvalidAudio(format!("failed to start input stream: {e}")))
        })?;

        tracing::info!(device_rate, channels, "microphone capture started");

        Ok(Self {
            _stream: stream,
            rx,
            device_rate,
            channels,
            pending: Vec::new(),
            disconnected: false,
        })
    }
}

impl AudioSource for MicSource {
    fn read(&mut self, out: &mut [f32]) -> Result<usize, StreamError> {
        while self.pending.len() < out.len() && !self.disconnected {
            match self.rx.recv_timeout(RECV_TIMEOUT) {
                Ok(chunk) => {
                    let mono = downmix(&chunk, self.channels);
                    let resampled = if self.device_rate == TARGET_SAMPLE_RATE_HZ {
                        mono
                    } else {
                        linear_resample(&mono, self.device_rate, TARGET_SAMPLE_RATE_HZ)
                    };
                    self.pending.extend(resampled);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => self.disconnected = true,
            }
        }

        let n = out.len().min(self.pending.len());
        out[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    tx: Sender<Vec<f32>>,
) -> Result<cpal::Stream, StreamError> {
    let err_fn = |err| tracing::warn!(error = %err, "input stream error");

    let stream = match format {
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &InputCallbackInfo| {
                let _ = tx.try_send(data.to_vec());
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &InputCallbackInfo| {
                let _ = tx.try_send(data.iter().map(|&s| s as f32 / i16::MAX as f32).collect());
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            config,
            move |data: &[u16], _: &InputCallbackInfo| {
                let converted = data
                    .iter()
                    .map(|&s| (s as f32 - u16::MAX as f32 / 2.0) / (u16::MAX as f32 / 2.0))
                    .collect();
                let _ = tx.try_send(converted);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(StreamError::Host(HostError::InvalidAudio(format!(
                "unsupported input sample format: {other:?}"
            ))))
        }
    };

    stream.map_err(|e| StreamError::Host(HostError::InvalidAudio(format!("failed to build input stream: {e}"))))
}

fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Good enough for a demo CLI: not sinc-quality, but deterministic and cheap.
fn linear_resample(samples: &[f32], from_hz: u32, to_hz: u32) -> Vec<f32> {
    if samples.is_empty() || from_hz == to_hz {
        return samples.to_vec();
    }
    let ratio = to_hz as f64 / from_hz as f64;
    let out_len = ((samples.len() as f64) * ratio).round() as usize;
    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            let frac = (src_pos - idx as f64) as f32;
            let a = samples.get(idx).copied().unwrap_or(0.0);
            let b = samples.get(idx + 1).copied().unwrap_or(a);
            a + (b - a) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_stereo_frames() {
        let stereo = vec![1.0, -1.0, 0.5, 0.5];
        assert_eq!(downmix(&stereo, 2), vec![0.0, 0.5]);
    }

    #[test]
    fn linear_resample_is_identity_at_matching_rate() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(linear_resample(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn linear_resample_halves_length_when_downsampling_by_half() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let resampled = linear_resample(&samples, 32_000, 16_000);
        assert_eq!(resampled.len(), 50);
    }
}
