use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SileroConfig {
    pub activation_threshold: f32,
    pub deactivation_threshold: f32,
}

impl Default for SileroConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 0.35,
            deactivation_threshold: 0.25,
        }
    }
}
