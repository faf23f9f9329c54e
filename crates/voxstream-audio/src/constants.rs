/// Sample rate every stream operates at. Matches the rate whisper.cpp-family
/// engines require; resampling to this rate is the audio source's job.
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Lookahead margin, in samples, added before the minimum chunk boundary when
/// running VAD so the model has speech/silence history before the search range
/// begins.
pub const VAD_LOOKAHEAD_MARGIN_SAMPLES: usize = 5 * SAMPLE_RATE_HZ as usize;
