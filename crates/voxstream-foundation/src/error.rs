use std::path::PathBuf;
use thiserror::Error;

/// Umbrella error returned by any public VoxStream operation.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Rejected before a stream is created: the supplied `StreamConfig` is internally
/// inconsistent (e.g. overlap_ms >= min_chunk_ms).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("min_chunk_ms must be greater than zero")]
    ZeroMinChunk,

    #[error("overlap_ms ({overlap_ms}) must be less than min_chunk_ms ({min_chunk_ms})")]
    OverlapTooLarge { overlap_ms: u32, min_chunk_ms: u32 },

    #[error("sample_rate must be greater than zero")]
    ZeroSampleRate,

    #[error("configuration parse error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Thread/allocation failures — spawning a worker, acquiring a lock that was poisoned.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to spawn {thread}: {source}")]
    Spawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("a worker thread panicked while holding shared stream state")]
    LockPoisoned,

    #[error("ring buffer capacity exceeded: requested {requested}, capacity {capacity}")]
    RingBufferOverflow { requested: usize, capacity: usize },
}

/// Model/VAD loading failures, surfaced from `load_model`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model file not found: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("failed to initialize inference context: {0}")]
    ContextInit(String),

    #[error("unsupported or corrupt model file: {0}")]
    InvalidModel(String),
}

/// Failures surfaced from the inference engine or VAD model during a run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("inference call failed: {0}")]
    InferenceFailed(String),

    #[error("voice activity detection failed: {0}")]
    VadFailed(String),

    #[error("requested GPU device is blocklisted: {device}")]
    GpuBlocklisted { device: String },
}

/// Failures attributable to the host application (callback misuse, bad input).
#[derive(Debug, Error)]
pub enum HostError {
    #[error("audio source returned invalid data: {0}")]
    InvalidAudio(String),

    #[error("callback produced non-UTF-8 output, discarded")]
    NonUtf8Output,

    #[error("host called {operation} with no active session")]
    NoActiveSession { operation: &'static str },
}

/// What a caller should do in response to a `StreamError`. Mirrors the original
/// JNI layer's distinction between transient device trouble and fatal model errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    Retry,
    Fallback,
    Fatal,
}

impl StreamError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            StreamError::Resource(ResourceError::Spawn { .. }) => RecoveryStrategy::Retry,
            StreamError::Engine(EngineError::GpuBlocklisted { .. }) => RecoveryStrategy::Fallback,
            StreamError::Load(_) | StreamError::Config(_) => RecoveryStrategy::Fatal,
            _ => RecoveryStrategy::Retry,
        }
    }
}
