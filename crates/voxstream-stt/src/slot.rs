//! A loadable inference-context holder (spec.md §3's Slot). Up to two exist;
//! slot 0 is authoritative for language detection and progress reporting.
//! Slots are owned exclusively by the controller and lent to worker threads
//! for the duration of a single stream run.

use voxstream_vad::VoiceActivityModel;

use crate::engine::InferenceEngine;

pub struct Slot {
    pub engine: Box<dyn InferenceEngine>,
    pub vad: Option<Box<dyn VoiceActivityModel>>,
    pub gpu_description: Option<String>,
}

impl Slot {
    pub fn new(
        engine: Box<dyn InferenceEngine>,
        vad: Option<Box<dyn VoiceActivityModel>>,
        gpu_description: Option<String>,
    ) -> Self {
        Self {
            engine,
            vad,
            gpu_description,
        }
    }
}
