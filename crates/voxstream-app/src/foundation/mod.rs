//! Generic process lifecycle plumbing for the demo binary: health checks,
//! Ctrl-C/shutdown coordination, and a small state machine. Independent of
//! the streaming scheduler, which owns its own session/cancellation model.

pub mod health;
pub mod shutdown;
pub mod state;

pub use health::{ComponentHealth, HealthCheck, HealthMonitor};
pub use shutdown::{ShutdownGuard, ShutdownHandler};
pub use state::{AppError, AppState, StateManager};
