//! Command controller (spec.md §4.1, C8): the single embedding-facing entry
//! point. One owner thread drains commands in FIFO order
//! (`std::sync::mpsc::channel`, simpler than reimplementing `jni.c`'s
//! hand-rolled linked-list queue + condvar — `Receiver::recv` already
//! blocks). `stop`, `set_duration`, and `update_language` bypass the queue
//! entirely by mutating state the running stream already polls, so they stay
//! responsive even while a `start` command occupies the owner thread for the
//! whole run.

use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use voxstream_audio::AudioSource;
use voxstream_foundation::error::LoadError;
use voxstream_telemetry::StreamMetrics;
use voxstream_vad::VoiceActivityModel;

use crate::config::{Language, StreamConfig};
use crate::engine::InferenceEngine;
use crate::events::StreamEvent;
use crate::gpu_policy::is_gpu_blocklisted;
use crate::session::SessionHandle;
use crate::slot::Slot;
use crate::worker::{self, RunControls, RunParams};

/// Host-supplied model loader for one slot. Loading is synchronous and runs
/// on the controller's owner thread; the host decides where the model bytes
/// come from (spec.md §1's "model loading from container storage").
pub trait ModelSource: Send {
    fn load(
        &self,
        use_gpu_hint: bool,
    ) -> Result<(Box<dyn InferenceEngine>, Option<String>), LoadError>;
}

/// Host-supplied VAD loader, paired with a slot's model.
pub trait VadSource: Send {
    fn load(&self) -> Result<Box<dyn VoiceActivityModel>, LoadError>;
}

enum Command {
    LoadModel {
        slot_index: usize,
        model: Option<Box<dyn ModelSource>>,
        vad: Option<Box<dyn VadSource>>,
        use_gpu_hint: bool,
    },
    Start {
        cfg: StreamConfig,
        params: RunParams,
        source: Box<dyn AudioSource>,
    },
    Shutdown,
}

/// Embedding-facing handle. Cheap to hold: the owner thread and its slots
/// live behind it, commands are queued, and `stop`/`set_duration`/
/// `update_language` touch shared atomics directly.
pub struct Controller {
    command_tx: Option<Sender<Command>>,
    owner_thread: Option<JoinHandle<()>>,
    session: SessionHandle,
    controls: Arc<RunControls>,
    metrics: Arc<StreamMetrics>,
}

impl Controller {
    /// `events_tx` is the host's channel; every `StreamEvent` is delivered on
    /// the owner thread, so the host must not call back into the controller
    /// from its consuming loop.
    pub fn new(events_tx: Sender<StreamEvent>) -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        let session = SessionHandle::new();
        let controls = Arc::new(RunControls::new());
        let metrics = Arc::new(StreamMetrics::default());

        let inner = ControllerInner {
            slots: [None, None],
            session: session.clone(),
            controls: Arc::clone(&controls),
            metrics: Arc::clone(&metrics),
            events_tx,
            command_rx,
        };
        let owner_thread = std::thread::spawn(move || inner.run());

        Self {
            command_tx: Some(command_tx),
            owner_thread: Some(owner_thread),
            session,
            controls,
            metrics,
        }
    }

    pub fn metrics(&self) -> &StreamMetrics {
        &self.metrics
    }

    pub fn load_model(
        &self,
        slot_index: usize,
        model: Box<dyn ModelSource>,
        vad: Option<Box<dyn VadSource>>,
        use_gpu_hint: bool,
    ) {
        self.send(Command::LoadModel {
            slot_index,
            model: Some(model),
            vad,
            use_gpu_hint,
        });
    }

    /// A null model source on slot 1 unloads it (spec.md §4.1).
    pub fn unload_model(&self, slot_index: usize) {
        self.send(Command::LoadModel {
            slot_index,
            model: None,
            vad: None,
            use_gpu_hint: false,
        });
    }

    pub fn start(
        &self,
        cfg: StreamConfig,
        num_threads: u32,
        language: Language,
        translate: bool,
        source: Box<dyn AudioSource>,
    ) {
        self.controls.duration_ms.store(0, Ordering::SeqCst);
        *self.controls.language_override.lock().unwrap() = None;
        let params = RunParams {
            num_threads: num_threads.max(1),
            translate,
            initial_language: language,
        };
        self.send(Command::Start { cfg, params, source });
    }

    /// Increments the session counter; the running stream (if any) terminates
    /// on its next poll. No acknowledgement.
    pub fn stop(&self) {
        self.session.stop();
    }

    /// 0 disables progress events.
    pub fn set_duration(&self, total_duration_ms: u64) {
        self.controls.duration_ms.store(total_duration_ms, Ordering::SeqCst);
    }

    pub fn update_language(&self, language_tag: Option<String>) {
        *self.controls.language_override.lock().unwrap() = language_tag;
    }

    /// Idempotent: increments the session, requests shutdown, and joins the
    /// owner thread. Safe to call while a stream is running.
    pub fn destroy(&mut self) {
        self.session.stop();
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(Command::Shutdown);
        }
        if let Some(handle) = self.owner_thread.take() {
            let _ = handle.join();
        }
    }

    fn send(&self, command: Command) {
        if let Some(tx) = &self.command_tx {
            let _ = tx.send(command);
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.destroy();
    }
}

struct ControllerInner {
    slots: [Option<Slot>; 2],
    session: SessionHandle,
    controls: Arc<RunControls>,
    metrics: Arc<StreamMetrics>,
    events_tx: Sender<StreamEvent>,
    command_rx: Receiver<Command>,
}

impl ControllerInner {
    fn run(mut self) {
        while let Ok(command) = self.command_rx.recv() {
            match command {
                Command::LoadModel {
                    slot_index,
                    model,
                    vad,
                    use_gpu_hint,
                } => self.handle_load_model(slot_index, model, vad, use_gpu_hint),
                Command::Start { cfg, params, source } => self.handle_start(cfg, params, source),
                Command::Shutdown => break,
            }
        }
    }

    fn handle_load_model(
        &mut self,
        slot_index: usize,
        model: Option<Box<dyn ModelSource>>,
        vad: Option<Box<dyn VadSource>>,
        use_gpu_hint: bool,
    ) {
        if slot_index > 1 {
            self.report_error(format!("invalid slot index {slot_index}"));
            return;
        }

        let Some(model) = model else {
            self.slots[slot_index] = None;
            return;
        };

        let (engine, gpu_description) = match model.load(use_gpu_hint) {
            Ok(loaded) => loaded,
            Err(err) => {
                self.report_error(err.to_string());
                return;
            }
        };

        let vad_ctx = match vad.map(|v| v.load()) {
            Some(Ok(vad_ctx)) => Some(vad_ctx),
            Some(Err(err)) => {
                self.report_error(err.to_string());
                None
            }
            None => None,
        };

        let reported_gpu = gpu_description.filter(|desc| {
            if is_gpu_blocklisted(desc) {
                self.metrics.record_gpu_blocklist_hit();
                false
            } else {
                true
            }
        });

        self.slots[slot_index] = Some(Slot::new(engine, vad_ctx, reported_gpu.clone()));
        let _ = self.events_tx.send(StreamEvent::Loaded {
            slot: slot_index,
            gpu_description: reported_gpu,
        });
    }

    fn handle_start(&mut self, cfg: StreamConfig, params: RunParams, source: Box<dyn AudioSource>) {
        if let Err(err) = cfg.validate() {
            self.report_error(err.to_string());
            return;
        }
        if self.slots[0].is_none() {
            self.report_error("slot 0 has no model loaded".to_string());
            return;
        }

        let session = self.session.start();
        let always_false = || false;

        let (first, rest) = self.slots.split_at_mut(1);
        let slot0 = first[0].as_mut().expect("checked above");
        let slot1 = rest[0].as_mut();

        worker::run_stream(
            slot0,
            slot1,
            source,
            &cfg,
            params,
            &self.controls,
            session,
            self.events_tx.clone(),
            &self.metrics,
            &always_false,
        );
    }

    fn report_error(&self, message: String) {
        let _ = self.events_tx.send(StreamEvent::Error { message });
    }
}
