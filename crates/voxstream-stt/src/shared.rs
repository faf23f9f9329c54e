//! Shared stream state for dual-worker mode (spec.md §3's Shared stream
//! state, §5's mutex/condvar pair). Single-worker mode never constructs
//! this — it owns the chunker and audio source directly with no locking.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use voxstream_audio::{AudioSource, Chunker, PreparedChunk};
use voxstream_foundation::error::StreamError;
use voxstream_vad::VoiceActivityModel;

struct ChunkTurn {
    chunker: Chunker,
    source: Box<dyn AudioSource>,
    next_chunk_idx: u64,
    stream_eof: bool,
}

#[derive(Default)]
struct PeerContext {
    ready: bool,
    tokens: Vec<i32>,
    lang_id: i32,
    lang_tag: Option<String>,
}

pub(crate) struct Shared {
    turn: Mutex<ChunkTurn>,
    turn_cv: Condvar,
    peer_ctx: Mutex<[PeerContext; 2]>,
    ctx_cv: Condvar,
    /// Which worker currently drives host-facing progress reporting.
    /// Sequentially consistent per spec.md §9's open question: a relaxed
    /// ordering here could let a reader observe a stale pointer and emit
    /// progress out of order.
    progress_reporter: AtomicUsize,
    abort: AtomicBool,
}

impl Shared {
    pub(crate) fn new(chunker: Chunker, source: Box<dyn AudioSource>) -> Self {
        // Worker 0 owns chunk 0, which has no predecessor to inherit context
        // from, so its slot starts pre-seeded as "ready" with nothing to
        // take. Worker 1's slot stays unready until worker 0's first hand-off.
        let seeded_worker0 = PeerContext {
            ready: true,
            ..PeerContext::default()
        };
        Self {
            turn: Mutex::new(ChunkTurn {
                chunker,
                source,
                next_chunk_idx: 0,
                stream_eof: false,
            }),
            turn_cv: Condvar::new(),
            peer_ctx: Mutex::new([seeded_worker0, PeerContext::default()]),
            ctx_cv: Condvar::new(),
            progress_reporter: AtomicUsize::new(0),
            abort: AtomicBool::new(false),
        }
    }

    pub(crate) fn request_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
        self.turn_cv.notify_all();
        self.ctx_cv.notify_all();
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    pub(crate) fn progress_reporter(&self) -> usize {
        self.progress_reporter.load(Ordering::SeqCst)
    }

    pub(crate) fn set_progress_reporter(&self, worker: usize) {
        self.progress_reporter.store(worker, Ordering::SeqCst);
    }

    /// Blocks until it is `parity`'s turn to cut the next chunk, then runs
    /// fill + VAD + boundary selection under the shared mutex using `vad`
    /// (the calling worker's own VAD context) before releasing the peer.
    /// Returns `None` once the stream is exhausted or the session aborts.
    pub(crate) fn prepare_next_chunk(
        &self,
        parity: usize,
        vad: Option<&mut dyn VoiceActivityModel>,
    ) -> Result<Option<PreparedChunk>, StreamError> {
        let mut turn = self.turn.lock();
        loop {
            if self.is_aborted() || turn.stream_eof {
                return Ok(None);
            }
            if turn.next_chunk_idx % 2 == parity as u64 {
                break;
            }
            self.turn_cv.wait(&mut turn);
        }

        let prepared = {
            let ChunkTurn {
                chunker, source, ..
            } = &mut *turn;
            chunker.prepare_chunk(source.as_mut(), vad)?
        };

        if prepared.is_some() {
            turn.next_chunk_idx += 1;
        } else {
            turn.stream_eof = true;
        }
        self.turn_cv.notify_all();
        Ok(prepared)
    }

    /// Hands decoder context to the peer worker (spec.md §4.6, steps a-c)
    /// and wakes it.
    pub(crate) fn hand_off(&self, peer: usize, tokens: Vec<i32>, lang_id: i32, lang_tag: String) {
        let mut ctx = self.peer_ctx.lock();
        ctx[peer] = PeerContext {
            ready: true,
            tokens,
            lang_id,
            lang_tag: Some(lang_tag),
        };
        drop(ctx);
        self.ctx_cv.notify_all();
    }

    /// Blocks until this worker's inherited context is ready (or the stream
    /// aborts), then takes and clears it. Returns `None` on abort.
    pub(crate) fn take_context(&self, me: usize) -> Option<(Vec<i32>, i32, Option<String>)> {
        let mut ctx = self.peer_ctx.lock();
        loop {
            if self.is_aborted() {
                return None;
            }
            if ctx[me].ready {
                break;
            }
            self.ctx_cv.wait(&mut ctx);
        }
        let taken = std::mem::take(&mut ctx[me]);
        Some((taken.tokens, taken.lang_id, taken.lang_tag))
    }
}
