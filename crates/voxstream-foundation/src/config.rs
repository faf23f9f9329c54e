//! Generic TOML + environment configuration loading, shared by every crate
//! that needs a `StreamConfig`/`ModelConfig`-shaped settings struct.

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Environment variable prefix applied to every overlay, e.g. `VOXSTREAM_STREAM__MIN_CHUNK_MS`.
pub const ENV_PREFIX: &str = "VOXSTREAM";

/// Loads `T` from an optional TOML file, overlaid with `VOXSTREAM_*` environment
/// variables (double underscore separates nested keys), falling back to `T::default()`
/// for anything neither source sets.
///
/// Mirrors the layering the original library applies via named profiles
/// (default / live mode / host file mode): a file supplies the bulk of the
/// settings, environment variables are reserved for ops overrides at deploy time.
pub fn load<T>(path: Option<&Path>) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default + serde::Serialize,
{
    let defaults = T::default();
    let mut builder = config::Config::builder().add_source(config::Config::try_from(&defaults)?);

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let merged = builder.build()?;
    Ok(merged.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serial_test::serial;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Example {
        threshold: u32,
        name: String,
    }

    // Both tests touch process-global environment state, so they must not
    // interleave with each other under the default parallel test runner.
    #[test]
    #[serial]
    fn load_with_no_file_returns_defaults() {
        let cfg: Example = load(None).unwrap();
        assert_eq!(cfg, Example::default());
    }

    #[test]
    #[serial]
    fn env_override_wins_over_default() {
        std::env::set_var("VOXSTREAM_THRESHOLD", "7");
        let cfg: Example = load(None).unwrap();
        std::env::remove_var("VOXSTREAM_THRESHOLD");
        assert_eq!(cfg.threshold, 7);
    }
}
