use serde::{Deserialize, Serialize};

/// Parameters handed to a [`crate::VoiceActivityModel`] on every
/// `detect_speech` call, mirroring the subset of `whisper_vad_params` the
/// scheduler actually overrides (`threshold`, `min_silence_duration_ms`);
/// `max_speech_duration_s` is derived from the window length at call time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VadConfig {
    pub threshold: f32,
    pub min_silence_duration_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_silence_duration_ms: 300,
        }
    }
}
