use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared counters/gauges updated from worker threads and read from the host
/// thread without locking. One instance per running stream.
#[derive(Clone)]
pub struct StreamMetrics {
    pub chunks_produced: Arc<AtomicU64>,
    pub segments_emitted: Arc<AtomicU64>,
    pub chunks_dropped_eof: Arc<AtomicU64>,

    /// Stream time, in centiseconds, covered by the most recently emitted chunk.
    pub progress_cs: Arc<AtomicU64>,

    /// Cumulative time each worker spent blocked waiting for its turn.
    pub worker_stall_ms: [Arc<AtomicU64>; 2],

    /// Cumulative time spent inside the inference engine's blocking call.
    pub inference_time_ms: Arc<AtomicU64>,

    pub gpu_blocklist_hits: Arc<AtomicU64>,
    pub vad_segments_detected: Arc<AtomicU64>,
    pub sessions_started: Arc<AtomicU64>,
    pub sessions_aborted: Arc<AtomicU64>,

    pub ring_buffer_fill_samples: Arc<AtomicUsize>,
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self {
            chunks_produced: Arc::new(AtomicU64::new(0)),
            segments_emitted: Arc::new(AtomicU64::new(0)),
            chunks_dropped_eof: Arc::new(AtomicU64::new(0)),
            progress_cs: Arc::new(AtomicU64::new(0)),
            worker_stall_ms: [Arc::new(AtomicU64::new(0)), Arc::new(AtomicU64::new(0))],
            inference_time_ms: Arc::new(AtomicU64::new(0)),
            gpu_blocklist_hits: Arc::new(AtomicU64::new(0)),
            vad_segments_detected: Arc::new(AtomicU64::new(0)),
            sessions_started: Arc::new(AtomicU64::new(0)),
            sessions_aborted: Arc::new(AtomicU64::new(0)),
            ring_buffer_fill_samples: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl StreamMetrics {
    pub fn record_chunk_produced(&self) {
        self.chunks_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_segment_emitted(&self) {
        self.segments_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eof_chunk_dropped(&self) {
        self.chunks_dropped_eof.fetch_add(1, Ordering::Relaxed);
    }

    /// Progress is expected to be monotonic per §9's sequentially-consistent
    /// ordering decision; callers on the progress-reporting path use `SeqCst`.
    pub fn update_progress_cs(&self, progress_cs: u64) {
        self.progress_cs.store(progress_cs, Ordering::SeqCst);
    }

    pub fn record_worker_stall(&self, worker: usize, stall: Duration) {
        self.worker_stall_ms[worker].fetch_add(stall.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_inference_time(&self, elapsed: Duration) {
        self.inference_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_gpu_blocklist_hit(&self) {
        self.gpu_blocklist_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_vad_segment(&self) {
        self.vad_segments_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_aborted(&self) {
        self.sessions_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_ring_buffer_fill(&self, samples: usize) {
        self.ring_buffer_fill_samples.store(samples, Ordering::Relaxed);
    }
}

/// Tracks a rolling chunks-per-second rate, ticked once per chunk produced.
#[derive(Debug)]
pub struct FpsTracker {
    last_update: Instant,
    frame_count: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    pub fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed >= Duration::from_secs(1) {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.frame_count = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}
