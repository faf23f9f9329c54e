//! Trait boundary to the external inference engine (spec.md §6). Everything
//! about loaded models, tokenizers and the VAD probability model lives on
//! the other side of this trait; the scheduler only ever sees
//! [`InferenceEngine`] and the data it exchanges per call.

use voxstream_foundation::error::EngineError;

/// Decoder-context language a worker passes into one `full_transcribe`
/// call. `Auto` and `Tag` both apply before any chunk has established a
/// detected language; `Inherited` carries the previous chunk's detected
/// language id forward (spec.md §4.6).
#[derive(Debug, Clone)]
pub enum LanguageSpec {
    Auto,
    Tag(String),
    Inherited(i32),
}

/// One segment as the engine decodes it, in centiseconds relative to the
/// start of the audio passed to this call.
#[derive(Debug, Clone)]
pub struct EngineSegment {
    pub text: String,
    pub t0_cs: i64,
    pub t1_cs: i64,
}

/// Everything a worker assembles before invoking the engine on one chunk
/// (spec.md §4.6's per-chunk engine parameters).
#[derive(Debug, Clone)]
pub struct TranscribeParams {
    pub duration_ms: u32,
    pub offset_ms: u32,
    pub num_threads: u32,
    pub translate: bool,
    /// Always `true`: decoder context comes from `tokens`/`language`, never
    /// from the engine's own running history.
    pub no_context: bool,
    pub tokens: Vec<i32>,
    pub language: LanguageSpec,
    pub vad_threshold: f32,
    pub min_silence_ms: u32,
}

/// What a worker learns from a completed call, needed to hand context off
/// to the next chunk (spec.md §4.6).
#[derive(Debug, Clone, Default)]
pub struct TranscribeOutcome {
    pub tokens: Vec<i32>,
    pub lang_id: i32,
    pub language_tag: String,
}

/// Engine-invoked capabilities during one `full_transcribe` call. Three of
/// spec.md §6's five callback slots (segment, progress, abort) live here;
/// the other two (read, language) belong to [`voxstream_audio::AudioSource`]
/// and the controller's language-override command respectively.
pub trait EngineCallbacks: Send {
    fn on_segment(&mut self, segment: EngineSegment);
    fn on_progress(&mut self, percent: u32);
    fn should_abort(&mut self) -> bool;
}

/// The inference context loaded into a slot. `voxstream-stt-whisper`'s
/// `WhisperEngine` is this workspace's concrete implementation.
pub trait InferenceEngine: Send {
    /// Used to derive `max_ctx_tokens = n_text_ctx / 2` (spec.md §6).
    fn n_text_ctx(&self) -> usize;

    fn full_transcribe(
        &mut self,
        audio: &[f32],
        params: &TranscribeParams,
        callbacks: &mut dyn EngineCallbacks,
    ) -> Result<TranscribeOutcome, EngineError>;
}
