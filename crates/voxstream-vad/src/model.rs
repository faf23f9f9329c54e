use crate::types::VadSegments;

/// External collaborator that turns a window of audio into speech/silence
/// segments. Invoked once per chunk over the lookahead window described in
/// `SPEC_FULL.md` §4.4a, not per-frame — the scheduler owns windowing and
/// boundary selection, this trait only classifies the samples it is given.
pub trait VoiceActivityModel: Send {
    /// Runs speech detection over `audio` (mono f32 at the stream's sample
    /// rate) and returns the segments found, using `min_silence_ms` as the
    /// minimum gap duration between two segments.
    fn detect_speech(&mut self, audio: &[f32], min_silence_ms: u32) -> Result<VadSegments, String>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::VadSegment;

    /// Scripted model returning a fixed segment list regardless of input,
    /// used by scheduler-level tests that don't want to depend on a real
    /// VAD backend.
    pub struct ScriptedVad {
        segments: VadSegments,
    }

    impl ScriptedVad {
        pub fn new(segments: Vec<VadSegment>) -> Self {
            Self {
                segments: VadSegments::new(segments),
            }
        }
    }

    impl VoiceActivityModel for ScriptedVad {
        fn detect_speech(&mut self, _audio: &[f32], _min_silence_ms: u32) -> Result<VadSegments, String> {
            Ok(self.segments.clone())
        }
    }
}
