//! whisper.cpp-backed [`InferenceEngine`]. Wraps one `WhisperContext` and its
//! reusable `WhisperState` behind the scheduler's engine trait; everything
//! about chunking, VAD, and context hand-off lives on the other side of that
//! boundary.

use std::ffi::CStr;
use std::path::PathBuf;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState};

use voxstream_foundation::error::{EngineError, LoadError};
use voxstream_stt::{
    EngineCallbacks, EngineSegment, InferenceEngine, LanguageSpec, ModelSource, TranscribeOutcome,
    TranscribeParams,
};

/// Loads a `WhisperContext` + initial state from a ggml model file on disk.
pub struct WhisperModelSource {
    model_path: PathBuf,
}

impl WhisperModelSource {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }
}

impl ModelSource for WhisperModelSource {
    fn load(
        &self,
        use_gpu_hint: bool,
    ) -> Result<(Box<dyn InferenceEngine>, Option<String>), LoadError> {
        if !self.model_path.exists() {
            return Err(LoadError::ModelNotFound {
                path: self.model_path.clone(),
            });
        }

        let mut cparams = WhisperContextParameters::default();
        cparams.use_gpu(use_gpu_hint);

        let ctx = WhisperContext::new_with_params(&self.model_path.to_string_lossy(), cparams)
            .map_err(|e| LoadError::ContextInit(e.to_string()))?;
        let state = ctx
            .create_state()
            .map_err(|e| LoadError::ContextInit(e.to_string()))?;

        let gpu_description = use_gpu_hint.then(|| compiled_gpu_backend_label().to_string());
        tracing::info!(
            model = %self.model_path.display(),
            gpu = ?gpu_description,
            "whisper context loaded"
        );

        Ok((Box::new(WhisperEngine { ctx, state }), gpu_description))
    }
}

fn compiled_gpu_backend_label() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA"
    } else if cfg!(feature = "vulkan") {
        "Vulkan"
    } else if cfg!(feature = "metal") {
        "Metal"
    } else if cfg!(feature = "opencl") {
        "OpenCL (CLBlast)"
    } else {
        "unknown GPU backend"
    }
}

fn lang_code_from_id(id: i32) -> Option<String> {
    if id < 0 {
        return None;
    }
    // whisper-rs does not expose an id-to-code lookup on `WhisperContext`;
    // whisper.cpp's own table is reachable only through the sys crate.
    unsafe {
        let ptr = whisper_rs_sys::whisper_lang_str(id);
        if ptr.is_null() {
            None
        } else {
            Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }
}

pub struct WhisperEngine {
    ctx: WhisperContext,
    state: WhisperState,
}

/// Raw pointer wrapper so the abort/progress closures below can be handed to
/// whisper-rs's `'static`-bound callback setters. Both closures only run
/// synchronously from inside the `state.full()` call a few lines down, which
/// cannot outlive the `&mut dyn EngineCallbacks` borrow it is built from.
struct CallbackPtr(*mut dyn EngineCallbacks);
unsafe impl Send for CallbackPtr {}

impl InferenceEngine for WhisperEngine {
    fn n_text_ctx(&self) -> usize {
        self.ctx.n_text_ctx() as usize
    }

    fn full_transcribe(
        &mut self,
        audio: &[f32],
        params: &TranscribeParams,
        callbacks: &mut dyn EngineCallbacks,
    ) -> Result<TranscribeOutcome, EngineError> {
        let mut fp = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        fp.set_n_threads(params.num_threads.max(1) as i32);
        fp.set_translate(params.translate);
        fp.set_no_context(params.no_context);
        fp.set_offset_ms(params.offset_ms as i32);
        fp.set_token_timestamps(true);
        fp.set_print_progress(false);
        fp.set_print_special(false);
        fp.set_print_realtime(false);
        fp.set_tokens(&params.tokens);

        // whisper.cpp's own native VAD gate (`whisper_full_params.vad` plus a
        // `whisper_vad_context`, set in the original via
        // `whisper_set_vad_context`/`params.vad_params.threshold`/
        // `min_silence_duration_ms`, stream.c:597-600) needs a
        // `whisper_vad_context` built from a separate ggml-format VAD model.
        // That context has no equivalent on this binding's `InferenceEngine`
        // side; the scheduler already runs VAD externally, once per chunk,
        // against the Silero ONNX model behind `VoiceActivityModel`
        // (voxstream-vad-silero), and uses both `vad_threshold` and
        // `min_silence_ms` to align every chunk boundary before any audio
        // reaches this call (spec.md §4.3/§4.4). Enabling whisper.cpp's
        // native VAD on top would re-detect speech on already-trimmed audio
        // and requires plumbing a second, whisper.cpp-specific VAD model
        // asset through `ModelSource`/the CLI for no boundary-accuracy gain.
        // See DESIGN.md's C5 entry.
        let _ = (params.vad_threshold, params.min_silence_ms);

        match &params.language {
            LanguageSpec::Auto => fp.set_language(None),
            LanguageSpec::Tag(tag) => fp.set_language(Some(tag.as_str())),
            LanguageSpec::Inherited(id) => match lang_code_from_id(*id) {
                Some(code) => fp.set_language(Some(&code)),
                None => fp.set_language(None),
            },
        }

        let abort_ptr = CallbackPtr(&mut *callbacks as *mut dyn EngineCallbacks);
        fp.set_abort_callback_safe(move || unsafe { (*abort_ptr.0).should_abort() });

        let progress_ptr = CallbackPtr(&mut *callbacks as *mut dyn EngineCallbacks);
        fp.set_progress_callback_safe(move |percent: i32| unsafe {
            (*progress_ptr.0).on_progress(percent.clamp(0, 100) as u32);
        });

        self.state
            .full(fp, audio)
            .map_err(|e| EngineError::InferenceFailed(e.to_string()))?;

        let eot_id = self.ctx.token_eot();
        let n_segments = self.state.full_n_segments();
        let mut tokens = Vec::new();

        for i in 0..n_segments {
            let Some(segment) = self.state.get_segment(i) else {
                continue;
            };
            let text = segment
                .to_str()
                .map_err(|e| EngineError::InferenceFailed(e.to_string()))?
                .to_string();

            callbacks.on_segment(EngineSegment {
                text,
                t0_cs: segment.start_timestamp(),
                t1_cs: segment.end_timestamp(),
            });

            for j in 0..segment.n_tokens() {
                if let Some(token) = segment.get_token(j) {
                    if token.token_id() < eot_id {
                        tokens.push(token.token_id());
                    }
                }
            }
        }

        let lang_id = self.state.full_lang_id();
        let language_tag = lang_code_from_id(lang_id).unwrap_or_default();

        Ok(TranscribeOutcome {
            tokens,
            lang_id,
            language_tag,
        })
    }
}
