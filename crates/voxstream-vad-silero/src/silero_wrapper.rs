use crate::config::SileroConfig;
use voice_activity_detector::VoiceActivityDetector;
use voxstream_vad::{VadSegment, VadSegments, VoiceActivityModel};

const FRAME_SIZE_SAMPLES: usize = 512;
const SAMPLE_RATE_HZ: u32 = 16_000;

#[derive(Copy, Clone, Default)]
struct F32Sample(f32);

impl voice_activity_detector::Sample for F32Sample {
    fn to_f32(self) -> f32 {
        self.0
    }
}

/// Wraps the Silero ONNX model (via `voice_activity_detector`) behind the
/// batch [`VoiceActivityModel`] interface: runs it frame-by-frame over the
/// whole window handed to `detect_speech`, applies the same
/// activation/deactivation hysteresis the teacher's streaming engine used,
/// and emits the resulting speech spans as segments instead of discrete
/// start/end events.
pub struct SileroVad {
    detector: VoiceActivityDetector,
    config: SileroConfig,
}

impl SileroVad {
    pub fn new(config: SileroConfig) -> Result<Self, String> {
        let detector = VoiceActivityDetector::builder()
            .sample_rate(SAMPLE_RATE_HZ as i64)
            .chunk_size(FRAME_SIZE_SAMPLES)
            .build()
            .map_err(|e| format!("failed to create Silero VAD: {e}"))?;

        Ok(Self { detector, config })
    }
}

enum State {
    Silence,
    Speech { start_frame: usize },
}

impl VoiceActivityModel for SileroVad {
    fn detect_speech(&mut self, audio: &[f32], min_silence_ms: u32) -> Result<VadSegments, String> {
        self.detector.reset();

        let min_silence_frames =
            (min_silence_ms as usize * SAMPLE_RATE_HZ as usize) / (1000 * FRAME_SIZE_SAMPLES);

        let mut state = State::Silence;
        let mut silence_run = 0usize;
        let mut segments = Vec::new();

        let n_frames = audio.len() / FRAME_SIZE_SAMPLES;
        for frame_idx in 0..n_frames {
            let frame = &audio[frame_idx * FRAME_SIZE_SAMPLES..(frame_idx + 1) * FRAME_SIZE_SAMPLES];
            let probability = self.detector.predict(frame.iter().map(|&s| F32Sample(s)));

            match state {
                State::Silence => {
                    if probability >= self.config.activation_threshold {
                        state = State::Speech {
                            start_frame: frame_idx,
                        };
                        silence_run = 0;
                    }
                }
                State::Speech { start_frame } => {
                    if probability < self.config.deactivation_threshold {
                        silence_run += 1;
                        if silence_run >= min_silence_frames.max(1) {
                            segments.push(frame_span(start_frame, frame_idx - silence_run + 1));
                            state = State::Silence;
                            silence_run = 0;
                        }
                    } else {
                        silence_run = 0;
                    }
                }
            }
        }

        if let State::Speech { start_frame } = state {
            segments.push(frame_span(start_frame, n_frames));
        }

        Ok(VadSegments::new(segments))
    }
}

fn frame_span(start_frame: usize, end_frame: usize) -> VadSegment {
    let t0_cs = (start_frame * FRAME_SIZE_SAMPLES * 100 / SAMPLE_RATE_HZ as usize) as i64;
    let t1_cs = (end_frame * FRAME_SIZE_SAMPLES * 100 / SAMPLE_RATE_HZ as usize) as i64;
    VadSegment { t0_cs, t1_cs }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_produces_no_segments() {
        let mut vad = SileroVad::new(SileroConfig::default()).unwrap();
        let silence = vec![0.0f32; FRAME_SIZE_SAMPLES * 20];
        let segs = vad.detect_speech(&silence, 300).unwrap();
        assert!(segs.is_empty());
    }
}
