//! Cooperative cancellation for the orchestration loop.
//!
//! Cancellation is a plain thread-safe flag rather than a process-wide
//! signal handler: external callers (a ctrl-c task, an operator API, a
//! supervising executor) flip the flag from any thread, and the loop
//! observes it once per iteration boundary. In-flight agent and tree
//! calls always complete before the loop exits.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared stop flag for one scenario run.
///
/// Wrapped in an [`Arc`](std::sync::Arc) and handed to whoever may need
/// to interrupt the run. Requesting a stop is sticky for the current run
/// and cleared on scenario reload.
#[derive(Debug, Default)]
pub struct StopToken {
    stop_requested: AtomicBool,
}

impl StopToken {
    /// Create a token with no stop pending.
    pub const fn new() -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Request a stop. The loop reacts at its next iteration boundary.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Clear a pending stop (scenario reload).
    pub fn reset(&self) {
        self.stop_requested.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_has_no_stop_pending() {
        let token = StopToken::new();
        assert!(!token.is_stop_requested());
    }

    #[test]
    fn request_stop_is_sticky_until_reset() {
        let token = StopToken::new();
        token.request_stop();
        assert!(token.is_stop_requested());
        token.request_stop();
        assert!(token.is_stop_requested());
        token.reset();
        assert!(!token.is_stop_requested());
    }

    #[test]
    fn visible_across_threads() {
        let token = std::sync::Arc::new(StopToken::new());
        let remote = std::sync::Arc::clone(&token);
        let handle = std::thread::spawn(move || remote.request_stop());
        assert!(handle.join().is_ok());
        assert!(token.is_stop_requested());
    }
}
