//! Stream configuration (spec.md §6's enumerated options), plus the named
//! presets the original JNI layer's `process_start_command` exposed
//! (`SPEC_FULL.md` §4.9): a default profile, a "live" profile tuned for
//! lower latency, and a "host file" profile tuned for offline batch
//! transcription of a fully-available recording.

use serde::{Deserialize, Serialize};

use voxstream_audio::ChunkerConfig;
use voxstream_foundation::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamProfile {
    Default,
    Live,
    HostFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub min_chunk_ms: u32,
    pub chunk_extend_ms: u32,
    pub overlap_ms: u32,
    pub min_silence_ms: u32,
    pub vad_threshold: f32,
    pub sample_rate_hz: u32,
}

impl StreamConfig {
    pub fn for_profile(profile: StreamProfile) -> Self {
        let sample_rate_hz = voxstream_audio::SAMPLE_RATE_HZ;
        match profile {
            StreamProfile::Default => Self {
                min_chunk_ms: 30_000,
                chunk_extend_ms: 20_000,
                overlap_ms: 300,
                min_silence_ms: 300,
                vad_threshold: 0.5,
                sample_rate_hz,
            },
            StreamProfile::Live => Self {
                min_chunk_ms: 10_000,
                chunk_extend_ms: 20_000,
                overlap_ms: 300,
                min_silence_ms: 300,
                vad_threshold: 0.5,
                sample_rate_hz,
            },
            StreamProfile::HostFile => Self {
                min_chunk_ms: 30_000,
                chunk_extend_ms: 30_000,
                overlap_ms: 300,
                min_silence_ms: 300,
                vad_threshold: 0.25,
                sample_rate_hz,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunker_config().validate()
    }

    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            min_chunk_ms: self.min_chunk_ms,
            chunk_extend_ms: self.chunk_extend_ms,
            overlap_ms: self.overlap_ms,
            min_silence_ms: self.min_silence_ms,
            sample_rate_hz: self.sample_rate_hz,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::for_profile(StreamProfile::Default)
    }
}

/// The language a host requests at `start()`; `Auto` lets the engine detect
/// it from the first chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    Auto,
    Tag(String),
}
