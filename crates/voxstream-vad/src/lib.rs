pub mod config;
pub mod constants;
pub mod model;
pub mod types;

pub use config::VadConfig;
pub use constants::SAMPLE_RATE_HZ;
pub use model::VoiceActivityModel;
pub use types::{VadSegment, VadSegments};
