//! Host-facing events (spec.md §6), delivered on the controller thread. The
//! host must not reenter the controller from inside the channel consumer.

/// All strings here have already passed UTF-8 validation; malformed engine
/// output is dropped before it reaches this enum rather than surfaced.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Emitted once per successful `load_model`.
    Loaded {
        slot: usize,
        gpu_description: Option<String>,
    },
    /// Emitted only when `set_duration` has set a nonzero denominator.
    /// Monotone non-decreasing per stream run; may skip values.
    Progress { percent: u32 },
    /// Timestamps are milliseconds relative to stream start.
    NewSegment {
        text: String,
        t0_ms: i64,
        t1_ms: i64,
        language_tag: Option<String>,
    },
    /// Emitted once per un-stopped run; silent if the session changed.
    StreamComplete { success: bool },
    /// Emitted on any load error or invariant violation; does not terminate
    /// the controller thread.
    Error { message: String },
}
