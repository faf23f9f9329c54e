pub mod config;
pub mod error;

pub use config::load as load_config;
pub use error::*;
