pub mod config;
#[cfg(feature = "silero")]
pub mod silero_wrapper;

pub use config::SileroConfig;

#[cfg(feature = "silero")]
pub use silero_wrapper::SileroVad;
