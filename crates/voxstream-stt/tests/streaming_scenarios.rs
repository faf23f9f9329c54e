//! End-to-end scenario tests driving [`voxstream_stt::Controller`] through a
//! scripted engine and VAD stub, with no model files or GPU involved.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use rand::Rng;

use voxstream_audio::{AudioSource, SliceSource};
use voxstream_foundation::error::{EngineError, LoadError};
use voxstream_stt::{
    Controller, EngineCallbacks, EngineSegment, InferenceEngine, LanguageSpec, Language,
    ModelSource, StreamConfig, StreamEvent, StreamProfile, TranscribeOutcome, TranscribeParams,
    VadSource,
};
use voxstream_vad::{VadSegment, VadSegments, VoiceActivityModel};

/// One canned response for a single `full_transcribe` call.
struct ScriptedChunk {
    segments: Vec<(i64, i64, &'static str)>,
    tokens: Vec<i32>,
    lang_id: i32,
    lang_tag: &'static str,
    /// After emitting its segments, spin-wait on `should_abort` instead of
    /// returning immediately. Used by the mid-stream cancellation scenario
    /// to give the test thread a deterministic window to call `stop()`.
    block_until_abort: bool,
}

impl ScriptedChunk {
    fn new(segments: Vec<(i64, i64, &'static str)>) -> Self {
        Self {
            segments,
            tokens: vec![],
            lang_id: -1,
            lang_tag: "",
            block_until_abort: false,
        }
    }
}

struct ScriptedEngine {
    script: Vec<ScriptedChunk>,
    call: std::sync::atomic::AtomicUsize,
}

impl ScriptedEngine {
    fn new(script: Vec<ScriptedChunk>) -> Self {
        Self {
            script,
            call: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

impl InferenceEngine for ScriptedEngine {
    fn n_text_ctx(&self) -> usize {
        128
    }

    fn full_transcribe(
        &mut self,
        _audio: &[f32],
        params: &TranscribeParams,
        callbacks: &mut dyn EngineCallbacks,
    ) -> Result<TranscribeOutcome, EngineError> {
        let idx = self.call.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let Some(chunk) = self.script.get(idx) else {
            return Ok(TranscribeOutcome::default());
        };

        // Mirrors real engines surfacing an inherited-language decision even
        // when the caller only passed a language tag.
        let _ = &params.language;

        for (t0_cs, t1_cs, text) in &chunk.segments {
            if callbacks.should_abort() {
                return Ok(TranscribeOutcome::default());
            }
            callbacks.on_segment(EngineSegment {
                text: text.to_string(),
                t0_cs: *t0_cs,
                t1_cs: *t1_cs,
            });
        }

        if chunk.block_until_abort {
            let deadline = Instant::now() + Duration::from_secs(2);
            while !callbacks.should_abort() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(1));
            }
            return Ok(TranscribeOutcome::default());
        }

        Ok(TranscribeOutcome {
            tokens: chunk.tokens.clone(),
            lang_id: chunk.lang_id,
            language_tag: chunk.lang_tag.to_string(),
        })
    }
}

/// Returns the language the engine was asked to use, so tests can assert on
/// the override/inheritance behavior without peeking at private state.
#[derive(Clone)]
struct LanguageSpy(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

impl LanguageSpy {
    fn new() -> Self {
        Self(std::sync::Arc::new(std::sync::Mutex::new(Vec::new())))
    }

    fn seen(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct SpyingEngine {
    inner: ScriptedEngine,
    spy: LanguageSpy,
}

impl InferenceEngine for SpyingEngine {
    fn n_text_ctx(&self) -> usize {
        self.inner.n_text_ctx()
    }

    fn full_transcribe(
        &mut self,
        audio: &[f32],
        params: &TranscribeParams,
        callbacks: &mut dyn EngineCallbacks,
    ) -> Result<TranscribeOutcome, EngineError> {
        let label = match &params.language {
            LanguageSpec::Auto => "auto".to_string(),
            LanguageSpec::Tag(tag) => format!("tag:{tag}"),
            LanguageSpec::Inherited(id) => format!("inherited:{id}"),
        };
        self.spy.0.lock().unwrap().push(label);
        self.inner.full_transcribe(audio, params, callbacks)
    }
}

/// Fixed speech/silence intervals, in centiseconds relative to the start of
/// whatever window it is asked to scan — good enough for these scenarios
/// since the chunker always hands the whole fresh+lookahead window to one
/// `detect_speech` call per chunk.
struct FixedVad {
    segments: VadSegments,
}

impl FixedVad {
    fn empty() -> Self {
        Self {
            segments: VadSegments::new(vec![]),
        }
    }

    fn intervals(pairs: &[(i64, i64)]) -> Self {
        Self {
            segments: VadSegments::new(
                pairs
                    .iter()
                    .map(|(t0, t1)| VadSegment { t0_cs: *t0, t1_cs: *t1 })
                    .collect(),
            ),
        }
    }
}

impl VoiceActivityModel for FixedVad {
    fn detect_speech(&mut self, _audio: &[f32], _min_silence_ms: u32) -> Result<VadSegments, String> {
        Ok(self.segments.clone())
    }
}

struct FixedModelSource {
    engine: std::sync::Mutex<Option<Box<dyn InferenceEngine>>>,
}

impl FixedModelSource {
    fn new(engine: Box<dyn InferenceEngine>) -> Self {
        Self {
            engine: std::sync::Mutex::new(Some(engine)),
        }
    }
}

impl ModelSource for FixedModelSource {
    fn load(&self, _use_gpu_hint: bool) -> Result<(Box<dyn InferenceEngine>, Option<String>), LoadError> {
        let engine = self
            .engine
            .lock()
            .unwrap()
            .take()
            .expect("FixedModelSource used more than once");
        Ok((engine, None))
    }
}

struct FixedVadSource {
    vad: std::sync::Mutex<Option<Box<dyn VoiceActivityModel>>>,
}

impl FixedVadSource {
    fn new(vad: Box<dyn VoiceActivityModel>) -> Self {
        Self {
            vad: std::sync::Mutex::new(Some(vad)),
        }
    }
}

impl VadSource for FixedVadSource {
    fn load(&self) -> Result<Box<dyn VoiceActivityModel>, LoadError> {
        Ok(self.vad.lock().unwrap().take().expect("FixedVadSource used more than once"))
    }
}

fn ramp_seconds(seconds: f64, sample_rate_hz: u32) -> Vec<f32> {
    let n = (seconds * sample_rate_hz as f64) as usize;
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|i| {
            let base = (i as f32 / n.max(1) as f32) * 0.5;
            base + rng.gen_range(-0.01..0.01)
        })
        .collect()
}

fn expect_loaded(rx: &mpsc::Receiver<StreamEvent>) {
    match rx.recv_timeout(Duration::from_secs(1)) {
        Ok(StreamEvent::Loaded { .. }) => {}
        other => panic!("expected Loaded event, got {other:?}"),
    }
}

fn recv_segments(rx: &mpsc::Receiver<StreamEvent>, timeout: Duration) -> Vec<StreamEvent> {
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match rx.recv_timeout(remaining) {
            Ok(event @ StreamEvent::StreamComplete { .. }) => {
                events.push(event);
                break;
            }
            Ok(event) => events.push(event),
            Err(_) => break,
        }
    }
    events
}

#[test]
fn s1_single_chunk_under_minimum_is_emitted_whole() {
    let (tx, rx) = mpsc::channel();
    let mut controller = Controller::new(tx);

    let engine = ScriptedEngine::new(vec![ScriptedChunk::new(vec![(0, 400, "hi")])]);
    controller.load_model(
        0,
        Box::new(FixedModelSource::new(Box::new(engine))),
        Some(Box::new(FixedVadSource::new(Box::new(FixedVad::empty())))),
        false,
    );

    let mut cfg = StreamConfig::for_profile(StreamProfile::Live);
    cfg.min_chunk_ms = 10_000;
    let audio = ramp_seconds(4.0, cfg.sample_rate_hz);
    let source: Box<dyn AudioSource> = Box::new(SliceSource::new(audio));

    expect_loaded(&rx);

    controller.start(cfg, 1, Language::Auto, false, source);
    let events = recv_segments(&rx, Duration::from_secs(2));

    let segments: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::NewSegment { text, t0_ms, t1_ms, .. } => Some((text.clone(), *t0_ms, *t1_ms)),
            _ => None,
        })
        .collect();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].0, "hi");
    assert_eq!(segments[0].1, 0);
    assert_eq!(segments[0].2, 4000);

    assert!(matches!(
        events.last(),
        Some(StreamEvent::StreamComplete { success: true })
    ));
}

#[test]
fn s2_two_chunks_cut_at_a_silence_boundary() {
    let (tx, rx) = mpsc::channel();
    let mut controller = Controller::new(tx);

    let engine = ScriptedEngine::new(vec![
        ScriptedChunk::new(vec![(0, 800, "first")]),
        ScriptedChunk::new(vec![(0, 800, "second")]),
    ]);
    let vad = FixedVad::intervals(&[(0, 800), (1100, 2000)]);

    controller.load_model(
        0,
        Box::new(FixedModelSource::new(Box::new(engine))),
        Some(Box::new(FixedVadSource::new(Box::new(vad)))),
        false,
    );

    let mut cfg = StreamConfig::for_profile(StreamProfile::Live);
    cfg.min_chunk_ms = 10_000;
    cfg.chunk_extend_ms = 10_000;
    let audio = ramp_seconds(25.0, cfg.sample_rate_hz);
    let source: Box<dyn AudioSource> = Box::new(SliceSource::new(audio));

    expect_loaded(&rx);
    controller.start(cfg, 1, Language::Auto, false, source);
    let events = recv_segments(&rx, Duration::from_secs(2));

    let segment_count = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::NewSegment { .. }))
        .count();
    assert_eq!(segment_count, 2);
    assert!(matches!(
        events.last(),
        Some(StreamEvent::StreamComplete { success: true })
    ));
}

#[test]
fn s3_no_silence_found_falls_back_to_max_chunk_twice() {
    let (tx, rx) = mpsc::channel();
    let mut controller = Controller::new(tx);

    let engine = ScriptedEngine::new(vec![
        ScriptedChunk::new(vec![(0, 500, "a")]),
        ScriptedChunk::new(vec![(0, 500, "b")]),
    ]);
    let vad = FixedVad::intervals(&[(0, 4000)]);

    controller.load_model(
        0,
        Box::new(FixedModelSource::new(Box::new(engine))),
        Some(Box::new(FixedVadSource::new(Box::new(vad)))),
        false,
    );

    let mut cfg = StreamConfig::for_profile(StreamProfile::Live);
    cfg.min_chunk_ms = 10_000;
    cfg.chunk_extend_ms = 10_000;
    let audio = ramp_seconds(40.0, cfg.sample_rate_hz);
    let source: Box<dyn AudioSource> = Box::new(SliceSource::new(audio));

    expect_loaded(&rx);
    controller.start(cfg, 1, Language::Auto, false, source);
    let events = recv_segments(&rx, Duration::from_secs(2));

    let segment_count = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::NewSegment { .. }))
        .count();
    assert_eq!(segment_count, 2);
}

#[test]
fn s4_stop_mid_stream_suppresses_stream_complete() {
    let (tx, rx) = mpsc::channel();
    let mut controller = Controller::new(tx);

    let mut first = ScriptedChunk::new(vec![(0, 400, "only-segment")]);
    first.block_until_abort = true;
    let second = ScriptedChunk::new(vec![(0, 400, "never-seen")]);
    let engine = ScriptedEngine::new(vec![first, second]);

    controller.load_model(
        0,
        Box::new(FixedModelSource::new(Box::new(engine))),
        Some(Box::new(FixedVadSource::new(Box::new(FixedVad::empty())))),
        false,
    );

    let mut cfg = StreamConfig::for_profile(StreamProfile::Live);
    cfg.min_chunk_ms = 10_000;
    cfg.chunk_extend_ms = 20_000;
    let audio = ramp_seconds(60.0, cfg.sample_rate_hz);
    let source: Box<dyn AudioSource> = Box::new(SliceSource::new(audio));

    expect_loaded(&rx);
    controller.start(cfg, 1, Language::Auto, false, source);

    let first_event = rx.recv_timeout(Duration::from_secs(2)).expect("first segment");
    assert!(matches!(first_event, StreamEvent::NewSegment { .. }));
    controller.stop();

    let rest = recv_segments(&rx, Duration::from_millis(500));
    assert!(!rest.iter().any(|e| matches!(e, StreamEvent::NewSegment { .. })));
    assert!(!rest.iter().any(|e| matches!(e, StreamEvent::StreamComplete { .. })));
}

#[test]
fn s5_language_override_discards_inherited_tokens() {
    let (tx, rx) = mpsc::channel();
    let mut controller = Controller::new(tx);

    let mut first = ScriptedChunk::new(vec![(0, 400, "bonjour-ish")]);
    first.tokens = vec![1, 2, 3];
    first.lang_id = 9;
    first.lang_tag = "en";
    let second = ScriptedChunk::new(vec![(0, 400, "second")]);
    let inner = ScriptedEngine::new(vec![first, second]);
    let spy = LanguageSpy::new();
    let engine = SpyingEngine {
        inner,
        spy: spy.clone(),
    };

    let vad = FixedVad::intervals(&[(0, 800), (1100, 3000)]);
    controller.load_model(
        0,
        Box::new(FixedModelSource::new(Box::new(engine))),
        Some(Box::new(FixedVadSource::new(Box::new(vad)))),
        false,
    );

    let mut cfg = StreamConfig::for_profile(StreamProfile::Live);
    cfg.min_chunk_ms = 10_000;
    cfg.chunk_extend_ms = 10_000;
    let audio = ramp_seconds(25.0, cfg.sample_rate_hz);
    let source: Box<dyn AudioSource> = Box::new(SliceSource::new(audio));

    expect_loaded(&rx);
    controller.start(cfg, 1, Language::Auto, false, source);

    // Give the first chunk a moment to land before overriding language for
    // the second.
    std::thread::sleep(Duration::from_millis(50));
    controller.update_language(Some("fr".to_string()));

    let events = recv_segments(&rx, Duration::from_secs(2));
    assert!(matches!(
        events.last(),
        Some(StreamEvent::StreamComplete { success: true })
    ));

    let seen = spy.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], "auto");
    assert_eq!(seen[1], "tag:fr");
}

#[test]
fn s6_dual_worker_preserves_monotone_segment_order() {
    let (tx, rx) = mpsc::channel();
    let mut controller = Controller::new(tx);

    let engine0 = ScriptedEngine::new(vec![
        ScriptedChunk::new(vec![(0, 500, "w0-c0")]),
        ScriptedChunk::new(vec![(0, 500, "w0-c2")]),
    ]);
    let engine1 = ScriptedEngine::new(vec![ScriptedChunk::new(vec![(0, 500, "w1-c1")])]);

    controller.load_model(
        0,
        Box::new(FixedModelSource::new(Box::new(engine0))),
        Some(Box::new(FixedVadSource::new(Box::new(FixedVad::empty())))),
        false,
    );
    controller.load_model(
        1,
        Box::new(FixedModelSource::new(Box::new(engine1))),
        Some(Box::new(FixedVadSource::new(Box::new(FixedVad::empty())))),
        false,
    );

    let mut cfg = StreamConfig::for_profile(StreamProfile::Live);
    cfg.min_chunk_ms = 10_000;
    cfg.chunk_extend_ms = 10_000;
    let audio = ramp_seconds(60.0, cfg.sample_rate_hz);
    let source: Box<dyn AudioSource> = Box::new(SliceSource::new(audio));

    expect_loaded(&rx);
    expect_loaded(&rx);

    controller.start(cfg, 1, Language::Auto, false, source);
    let events = recv_segments(&rx, Duration::from_secs(3));

    let timestamps: Vec<(i64, i64)> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::NewSegment { t0_ms, t1_ms, .. } => Some((*t0_ms, *t1_ms)),
            _ => None,
        })
        .collect();
    assert_eq!(timestamps.len(), 3);
    for pair in timestamps.windows(2) {
        assert!(pair[0].0 <= pair[1].0);
        assert!(pair[0].1 <= pair[1].1);
    }
}
