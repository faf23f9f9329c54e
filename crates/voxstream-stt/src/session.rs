//! Process-wide generation counter used for cancellation (spec.md §3's
//! Session, §4.7, §5). A session has no persisted state: stopping one simply
//! invalidates every in-flight read of the counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Owned by the controller. `stop()` increments the generation; anything
/// holding an older [`StreamSession`] snapshot observes itself as stale on
/// its next check.
#[derive(Clone)]
pub struct SessionHandle {
    generation: Arc<AtomicU64>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Atomically increments the session counter. No acknowledgement: the
    /// currently running stream (if any) terminates on its next poll.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Begins a new generation and captures it for a new stream run. Bumping
    /// on `start()` too (not just `stop()`) means an overlapping `start()`
    /// always invalidates whatever came before it, regardless of whether the
    /// host remembered to call `stop()` first.
    pub fn start(&self) -> StreamSession {
        let started_at = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        StreamSession {
            generation: Arc::clone(&self.generation),
            started_at,
        }
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A single stream run's view of the session counter.
#[derive(Clone)]
pub struct StreamSession {
    generation: Arc<AtomicU64>,
    started_at: u64,
}

impl StreamSession {
    /// False the instant `stop()` (or a newer `start()`) bumps the counter.
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_current() {
        let handle = SessionHandle::new();
        let session = handle.start();
        assert!(session.is_current());
    }

    #[test]
    fn stop_invalidates_outstanding_sessions() {
        let handle = SessionHandle::new();
        let session = handle.start();
        handle.stop();
        assert!(!session.is_current());
    }

    #[test]
    fn starting_a_new_session_invalidates_the_old_one() {
        let handle = SessionHandle::new();
        let first = handle.start();
        let second = handle.start();
        assert!(!first.is_current());
        assert!(second.is_current());
    }
}
