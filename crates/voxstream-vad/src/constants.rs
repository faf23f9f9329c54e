//! Shared constants for VAD processing.

/// Sample rate every [`crate::VoiceActivityModel`] is handed audio at.
pub const SAMPLE_RATE_HZ: u32 = 16_000;
