//! Chunked streaming transcription scheduler.
//!
//! Segments an arbitrary-length audio stream into overlapping,
//! voice-activity-aligned chunks, drives one or two inference contexts in
//! parallel to transcribe them, stitches the per-chunk outputs into a single
//! monotonically-timestamped transcript, and relays progress/error/control
//! signals between the embedding application and the inference layer.
//!
//! The inference engine, VAD probability model, and audio source are all
//! external collaborators reached through [`engine::InferenceEngine`],
//! [`voxstream_vad::VoiceActivityModel`], and [`voxstream_audio::AudioSource`]
//! respectively; this crate owns only the scheduling.

pub mod config;
pub mod controller;
pub mod engine;
pub mod events;
pub mod gpu_policy;
pub mod session;
mod shared;
pub mod slot;
mod worker;

pub use config::{Language, StreamConfig, StreamProfile};
pub use controller::{Controller, ModelSource, VadSource};
pub use engine::{EngineCallbacks, EngineSegment, InferenceEngine, LanguageSpec, TranscribeOutcome, TranscribeParams};
pub use events::StreamEvent;
pub use gpu_policy::is_gpu_blocklisted;
pub use session::{SessionHandle, StreamSession};
pub use slot::Slot;
