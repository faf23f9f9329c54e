//! Per-chunk transcription logic: engine invocation, context hand-off, and
//! segment emission clipping (spec.md §4.6). [`run_stream`] is the single
//! entry point the controller calls once per `start()` command; it fans out
//! to one or two OS threads depending on how many slots are loaded, and
//! blocks the calling (controller) thread for the run's duration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::time::Instant;

use voxstream_audio::{AudioSource, ChunkDescriptor, Chunker, PreparedChunk};
use voxstream_foundation::error::{ResourceError, StreamError};
use voxstream_telemetry::StreamMetrics;

use crate::config::{Language, StreamConfig};
use crate::engine::{EngineCallbacks, EngineSegment, LanguageSpec, TranscribeParams};
use crate::events::StreamEvent;
use crate::session::StreamSession;
use crate::shared::Shared;
use crate::slot::Slot;

/// Parameters captured once at `start()` that stay constant for the run.
pub(crate) struct RunParams {
    pub num_threads: u32,
    pub translate: bool,
    pub initial_language: Language,
}

/// Controls the host mutates mid-run without going through the command
/// queue (spec.md §4.1's set_duration/update_language bypass).
pub(crate) struct RunControls {
    pub duration_ms: AtomicU64,
    pub language_override: Mutex<Option<String>>,
}

impl RunControls {
    pub(crate) fn new() -> Self {
        Self {
            duration_ms: AtomicU64::new(0),
            language_override: Mutex::new(None),
        }
    }

    fn take_override(&self) -> Option<String> {
        self.language_override.lock().unwrap().take()
    }
}

const fn cs_for_samples(samples: usize, sample_rate_hz: u32) -> i64 {
    (samples as i64 * 100) / sample_rate_hz as i64
}

struct WorkerState {
    tokens: Vec<i32>,
    lang_id: i32,
    language_tag: Option<String>,
    last_t1_cs: i64,
}

impl WorkerState {
    fn new(initial: &Language) -> Self {
        let language_tag = match initial {
            Language::Auto => None,
            Language::Tag(tag) => Some(tag.clone()),
        };
        Self {
            tokens: Vec::new(),
            lang_id: -1,
            language_tag,
            last_t1_cs: 0,
        }
    }
}

/// Bridges engine callbacks to host-facing segment clipping and progress
/// reporting for one chunk. One instance is built per `full_transcribe` call.
struct SegmentCallbacks<'a> {
    descriptor: &'a ChunkDescriptor,
    output_start_cs: i64,
    sample_rate_hz: u32,
    state: &'a mut WorkerState,
    events_tx: &'a Sender<StreamEvent>,
    session: &'a StreamSession,
    shared: Option<&'a Shared>,
    parity: usize,
    duration_ms: &'a AtomicU64,
    metrics: &'a StreamMetrics,
    external_abort: &'a dyn Fn() -> bool,
}

impl<'a> EngineCallbacks for SegmentCallbacks<'a> {
    fn on_segment(&mut self, segment: EngineSegment) {
        if !self.session.is_current() {
            return;
        }
        let mut t0 = segment.t0_cs + self.descriptor.time_offset_cs;
        let mut t1 = segment.t1_cs + self.descriptor.time_offset_cs;

        t0 = t0.max(self.output_start_cs);
        let chunk_end_cs = self.descriptor.time_offset_cs
            + cs_for_samples(self.descriptor.actual_samples, self.sample_rate_hz);
        t1 = t1.min(chunk_end_cs);
        t0 = t0.max(self.state.last_t1_cs);

        if t0 >= t1 {
            return;
        }
        self.state.last_t1_cs = t1;
        self.metrics.record_segment_emitted();

        let text = match String::from_utf8(segment.text.into_bytes()) {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!("dropped non-UTF-8 segment text");
                return;
            }
        };

        let _ = self.events_tx.send(StreamEvent::NewSegment {
            text,
            t0_ms: t0 * 10,
            t1_ms: t1 * 10,
            language_tag: self.state.language_tag.clone(),
        });
    }

    fn on_progress(&mut self, local_percent: u32) {
        if !self.session.is_current() {
            return;
        }
        let is_reporter = match self.shared {
            Some(shared) => shared.progress_reporter() == self.parity,
            None => true,
        };
        if !is_reporter {
            return;
        }
        let duration_ms = self.duration_ms.load(Ordering::SeqCst);
        if duration_ms == 0 {
            return;
        }
        let local_percent = local_percent.min(100) as u64;
        let covered_samples = self.descriptor.samples_before as u64
            + (self.descriptor.actual_samples as u64 * local_percent / 100);
        let covered_ms = covered_samples * 1000 / self.sample_rate_hz as u64;
        self.metrics.update_progress_cs(covered_ms / 10);
        let percent = ((covered_ms * 100) / duration_ms).min(100) as u32;
        let _ = self.events_tx.send(StreamEvent::Progress { percent });
    }

    fn should_abort(&mut self) -> bool {
        if !self.session.is_current() {
            return true;
        }
        if let Some(shared) = self.shared {
            if shared.is_aborted() {
                return true;
            }
        }
        (self.external_abort)()
    }
}

/// Everything a worker needs that doesn't change chunk to chunk.
struct WorkerCtx<'a> {
    parity: usize,
    dual: bool,
    params: &'a RunParams,
    controls: &'a RunControls,
    session: &'a StreamSession,
    events_tx: &'a Sender<StreamEvent>,
    metrics: &'a StreamMetrics,
    sample_rate_hz: u32,
    vad_threshold: f32,
    min_silence_ms: u32,
    external_abort: &'a dyn Fn() -> bool,
}

/// Runs one engine call for a single chunk: context inheritance, language
/// override, engine invocation, and (in dual mode) hand-off to the peer.
/// Returns `Ok(true)` if the stream should continue to the next chunk.
fn process_chunk(
    ctx: &WorkerCtx,
    slot: &mut Slot,
    shared: Option<&Shared>,
    state: &mut WorkerState,
    prepared: PreparedChunk,
) -> Result<bool, StreamError> {
    let PreparedChunk { descriptor, audio } = prepared;

    if ctx.dual {
        let shared = shared.expect("dual mode always has Shared");
        match shared.take_context(ctx.parity) {
            Some((tokens, lang_id, lang_tag)) => {
                if descriptor.samples_before > 0 {
                    state.tokens = tokens;
                    state.lang_id = lang_id;
                    if lang_tag.is_some() {
                        state.language_tag = lang_tag;
                    }
                }
            }
            None => return Ok(false),
        }
    }

    if let Some(override_tag) = ctx.controls.take_override() {
        if Some(&override_tag) != state.language_tag.as_ref() {
            state.tokens.clear();
            state.lang_id = -1;
        }
        state.language_tag = Some(override_tag);
    }

    let max_ctx_tokens = slot.engine.n_text_ctx() / 2;
    if state.tokens.len() > max_ctx_tokens {
        let trim = state.tokens.len() - max_ctx_tokens;
        state.tokens.drain(0..trim);
    }

    let language = match (&state.language_tag, state.lang_id) {
        (Some(_), lang_id) if lang_id >= 0 => LanguageSpec::Inherited(lang_id),
        (Some(tag), _) => LanguageSpec::Tag(tag.clone()),
        (None, _) => LanguageSpec::Auto,
    };

    let transcribe_params = TranscribeParams {
        duration_ms: (cs_for_samples(descriptor.actual_samples, ctx.sample_rate_hz) * 10) as u32,
        offset_ms: if descriptor.overlap_offset > 0 {
            (cs_for_samples(descriptor.overlap_offset, ctx.sample_rate_hz) * 10) as u32
        } else {
            0
        },
        num_threads: ctx.params.num_threads,
        translate: ctx.params.translate,
        no_context: true,
        tokens: state.tokens.clone(),
        language,
        vad_threshold: ctx.vad_threshold,
        min_silence_ms: ctx.min_silence_ms,
    };

    let output_start_cs =
        descriptor.time_offset_cs + cs_for_samples(descriptor.overlap_offset, ctx.sample_rate_hz);

    let mut callbacks = SegmentCallbacks {
        descriptor: &descriptor,
        output_start_cs,
        sample_rate_hz: ctx.sample_rate_hz,
        state,
        events_tx: ctx.events_tx,
        session: ctx.session,
        shared,
        parity: ctx.parity,
        duration_ms: &ctx.controls.duration_ms,
        metrics: ctx.metrics,
        external_abort: ctx.external_abort,
    };

    let inference_start = Instant::now();
    let outcome = slot
        .engine
        .full_transcribe(&audio, &transcribe_params, &mut callbacks)
        .map_err(StreamError::Engine)?;
    ctx.metrics.record_inference_time(inference_start.elapsed());

    if !ctx.session.is_current() {
        return Ok(false);
    }

    state.tokens = outcome.tokens;
    state.lang_id = outcome.lang_id;
    if !outcome.language_tag.is_empty() {
        state.language_tag = Some(outcome.language_tag);
    }

    if ctx.dual {
        let shared = shared.expect("dual mode always has Shared");
        let peer = 1 - ctx.parity;
        shared.hand_off(
            peer,
            state.tokens.clone(),
            state.lang_id,
            state.language_tag.clone().unwrap_or_default(),
        );
        shared.set_progress_reporter(peer);
    }

    Ok(!descriptor.is_last)
}

fn run_solo(
    slot: &mut Slot,
    source: &mut dyn AudioSource,
    cfg: &StreamConfig,
    ctx: &WorkerCtx,
) -> Result<(), StreamError> {
    let mut chunker = Chunker::new(cfg.chunker_config())?;
    let mut state = WorkerState::new(&ctx.params.initial_language);

    loop {
        if !ctx.session.is_current() || (ctx.external_abort)() {
            return Ok(());
        }
        let vad = slot.vad.as_deref_mut();
        let prepared = chunker.prepare_chunk(source, vad)?;
        let Some(prepared) = prepared else {
            return Ok(());
        };
        ctx.metrics.record_chunk_produced();
        let descriptor = prepared.descriptor.clone();
        let keep_going = process_chunk(ctx, slot, None, &mut state, prepared)?;
        chunker.advance(&descriptor);
        if !keep_going {
            return Ok(());
        }
    }
}

fn run_peer(
    parity: usize,
    slot: &mut Slot,
    shared: &Shared,
    ctx: &WorkerCtx,
) -> Result<(), StreamError> {
    let mut state = WorkerState::new(&ctx.params.initial_language);
    loop {
        if !ctx.session.is_current() || (ctx.external_abort)() {
            return Ok(());
        }
        let vad = slot.vad.as_deref_mut();
        let stall_start = Instant::now();
        let prepared = shared.prepare_next_chunk(parity, vad)?;
        ctx.metrics.record_worker_stall(parity, stall_start.elapsed());

        let Some(prepared) = prepared else {
            return Ok(());
        };
        ctx.metrics.record_chunk_produced();
        let keep_going = process_chunk(ctx, slot, Some(shared), &mut state, prepared)?;
        if !keep_going {
            return Ok(());
        }
    }
}

fn run_dual(
    slot0: &mut Slot,
    slot1: &mut Slot,
    source: Box<dyn AudioSource>,
    cfg: &StreamConfig,
    params: &RunParams,
    controls: &RunControls,
    session: &StreamSession,
    events_tx: &Sender<StreamEvent>,
    metrics: &StreamMetrics,
    external_abort: &dyn Fn() -> bool,
) -> Result<(), StreamError> {
    let chunker = Chunker::new(cfg.chunker_config())?;
    let shared = Shared::new(chunker, source);

    let new_ctx = |parity| WorkerCtx {
        parity,
        dual: true,
        params,
        controls,
        session,
        events_tx,
        metrics,
        sample_rate_hz: cfg.sample_rate_hz,
        vad_threshold: cfg.vad_threshold,
        min_silence_ms: cfg.min_silence_ms,
        external_abort,
    };
    let ctx0 = new_ctx(0);
    let ctx1 = new_ctx(1);

    std::thread::scope(|scope| {
        let h0 = scope.spawn(|| run_peer(0, slot0, &shared, &ctx0));
        let h1 = scope.spawn(|| run_peer(1, slot1, &shared, &ctx1));
        let lock_poisoned = || StreamError::Resource(ResourceError::LockPoisoned);
        let r0 = h0.join().unwrap_or_else(|_| Err(lock_poisoned()));
        let r1 = h1.join().unwrap_or_else(|_| Err(lock_poisoned()));
        r0.and(r1)
    })
}

/// Entry point invoked once per `start()` command. Blocks the calling
/// thread (the controller's owner thread) for the run's duration and
/// reports `StreamComplete` unless the session changed underneath it.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_stream(
    slot0: &mut Slot,
    slot1: Option<&mut Slot>,
    mut source: Box<dyn AudioSource>,
    cfg: &StreamConfig,
    params: RunParams,
    controls: &RunControls,
    session: StreamSession,
    events_tx: Sender<StreamEvent>,
    metrics: &StreamMetrics,
    external_abort: &dyn Fn() -> bool,
) {
    metrics.record_session_started();

    let result = if let Some(slot1) = slot1 {
        run_dual(
            slot0,
            slot1,
            source,
            cfg,
            &params,
            controls,
            &session,
            &events_tx,
            metrics,
            external_abort,
        )
    } else {
        let ctx = WorkerCtx {
            parity: 0,
            dual: false,
            params: &params,
            controls,
            session: &session,
            events_tx: &events_tx,
            metrics,
            sample_rate_hz: cfg.sample_rate_hz,
            vad_threshold: cfg.vad_threshold,
            min_silence_ms: cfg.min_silence_ms,
            external_abort,
        };
        run_solo(slot0, source.as_mut(), cfg, &ctx)
    };

    if !session.is_current() {
        metrics.record_session_aborted();
        return;
    }

    match result {
        Ok(()) => {
            let _ = events_tx.send(StreamEvent::StreamComplete { success: true });
        }
        Err(err) => {
            tracing::warn!(error = %err, "stream run ended with an error");
            let _ = events_tx.send(StreamEvent::Error {
                message: err.to_string(),
            });
            let _ = events_tx.send(StreamEvent::StreamComplete { success: false });
        }
    }
}
