//! Background liveness timer for the orchestration loop.
//!
//! The watchdog runs on its own thread and watches a single counter: the
//! time elapsed since the last [`Watchdog::update`] call. If the loop
//! fails to refresh it within the configured timeout -- typically
//! because an agent step is stuck -- the watchdog flips a sticky alive
//! flag to `false`, wakes any blocked waiters, and exits its thread.
//!
//! Expiry is not an error by itself: the orchestrator observes the dead
//! flag at the next iteration boundary and terminates the run. One
//! expiry ends the scenario; `update()` after expiry does not revive the
//! flag, only a fresh [`Watchdog::start`] does.
//!
//! # Concurrency
//!
//! The hot path (`update`, `status`) is lock-free: a monotonic
//! millisecond counter in an [`AtomicU64`] and the alive flag in an
//! [`AtomicBool`]. A mutex/condvar pair exists only for callers that
//! want to block until expiry.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Lower bound on the timer thread's sampling interval.
const MIN_GRANULARITY_MS: u64 = 10;

/// Upper bound on the timer thread's sampling interval.
const MAX_GRANULARITY_MS: u64 = 250;

/// State shared between the owning handle and the timer thread.
#[derive(Debug)]
struct WatchdogInner {
    /// Anchor instant for the millisecond counters.
    epoch: Instant,

    /// Milliseconds since `epoch` at the last `update()` call.
    last_update_ms: AtomicU64,

    /// Sticky liveness flag; flipped to `false` exactly once per run.
    alive: AtomicBool,

    /// Set by `stop()` to ask the timer thread to exit.
    shutdown: AtomicBool,

    /// Expiry latch for blocking waiters.
    expired: Mutex<bool>,

    /// Wakes waiters blocked in `wait_expired`.
    expired_cv: Condvar,
}

impl WatchdogInner {
    /// Milliseconds elapsed since the shared epoch.
    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Liveness timer with a background sampling thread.
///
/// Created with a fixed timeout; [`start`](Self::start) spawns the timer
/// thread, [`update`](Self::update) must then be called more often than
/// the timeout, and [`status`](Self::status) reports the sticky alive
/// flag without blocking.
#[derive(Debug)]
pub struct Watchdog {
    timeout: Duration,
    inner: Arc<WatchdogInner>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Create a watchdog with the given timeout. The timer thread is not
    /// started yet; the alive flag starts `true`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            inner: Arc::new(WatchdogInner {
                epoch: Instant::now(),
                last_update_ms: AtomicU64::new(0),
                alive: AtomicBool::new(true),
                shutdown: AtomicBool::new(false),
                expired: Mutex::new(false),
                expired_cv: Condvar::new(),
            }),
            thread: None,
        }
    }

    /// The configured timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start (or restart) the background timer thread.
    ///
    /// Resets the alive flag, the expiry latch, and the elapsed counter,
    /// then spawns a thread that samples the counter at sub-second
    /// granularity (timeout / 20, clamped to 10-250 ms). A previous
    /// thread, if any, is stopped first.
    pub fn start(&mut self) {
        self.stop();

        self.inner.shutdown.store(false, Ordering::Release);
        self.inner.alive.store(true, Ordering::Release);
        self.inner
            .last_update_ms
            .store(self.inner.now_ms(), Ordering::Release);
        *lock_ignore_poison(&self.inner.expired) = false;

        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let granularity_ms = timeout_ms
            .checked_div(20)
            .unwrap_or(MIN_GRANULARITY_MS)
            .clamp(MIN_GRANULARITY_MS, MAX_GRANULARITY_MS);

        let inner = Arc::clone(&self.inner);
        self.thread = Some(std::thread::spawn(move || {
            run_timer(&inner, timeout_ms, granularity_ms);
        }));
        debug!(
            timeout_ms,
            granularity_ms, "Watchdog timer thread started"
        );
    }

    /// Reset the elapsed counter (proof of life from the loop).
    ///
    /// Lock-free. Has no effect on an already-expired watchdog: the
    /// alive flag is sticky until the next [`start`](Self::start).
    pub fn update(&self) {
        self.inner
            .last_update_ms
            .store(self.inner.now_ms(), Ordering::Release);
    }

    /// Current liveness without blocking.
    pub fn status(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Stop the timer thread. Idempotent; safe to call before `start`.
    pub fn stop(&mut self) {
        self.inner.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            // The thread exits within one granularity; a panicked timer
            // thread has nothing left to corrupt.
            let _ = handle.join();
        }
    }

    /// Block until the watchdog expires or `limit` elapses.
    ///
    /// Returns `true` if the watchdog expired. Useful for embedders that
    /// want push-style stall notification instead of polling
    /// [`status`](Self::status).
    pub fn wait_expired(&self, limit: Duration) -> bool {
        let deadline = Instant::now().checked_add(limit);
        let mut expired = lock_ignore_poison(&self.inner.expired);
        while !*expired {
            let Some(deadline) = deadline else {
                return false;
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, timed_out) = self
                .inner
                .expired_cv
                .wait_timeout(expired, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            expired = guard;
            if timed_out.timed_out() && !*expired {
                return false;
            }
        }
        true
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Timer thread body: sample the elapsed counter until shutdown or expiry.
fn run_timer(inner: &WatchdogInner, timeout_ms: u64, granularity_ms: u64) {
    loop {
        std::thread::sleep(Duration::from_millis(granularity_ms));
        if inner.shutdown.load(Ordering::Acquire) {
            return;
        }
        let last = inner.last_update_ms.load(Ordering::Acquire);
        let idle_ms = inner.now_ms().saturating_sub(last);
        if idle_ms > timeout_ms {
            inner.alive.store(false, Ordering::Release);
            *lock_ignore_poison(&inner.expired) = true;
            inner.expired_cv.notify_all();
            warn!(idle_ms, timeout_ms, "Watchdog expired");
            return;
        }
    }
}

/// Lock a mutex, recovering the guard if a holder panicked.
fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alive_before_start() {
        let watchdog = Watchdog::new(Duration::from_millis(50));
        assert!(watchdog.status());
    }

    #[test]
    fn stays_alive_under_frequent_updates() {
        let mut watchdog = Watchdog::new(Duration::from_millis(100));
        watchdog.start();
        for _ in 0..8 {
            std::thread::sleep(Duration::from_millis(25));
            watchdog.update();
            assert!(watchdog.status());
        }
        watchdog.stop();
    }

    #[test]
    fn expires_without_updates() {
        let mut watchdog = Watchdog::new(Duration::from_millis(40));
        watchdog.start();
        std::thread::sleep(Duration::from_millis(200));
        assert!(!watchdog.status());
    }

    #[test]
    fn expiry_is_sticky_until_restart() {
        let mut watchdog = Watchdog::new(Duration::from_millis(40));
        watchdog.start();
        std::thread::sleep(Duration::from_millis(200));
        assert!(!watchdog.status());

        // update() must not revive an expired watchdog.
        watchdog.update();
        assert!(!watchdog.status());

        // start() resets the flag.
        watchdog.start();
        assert!(watchdog.status());
        watchdog.stop();
    }

    #[test]
    fn wait_expired_unblocks_on_expiry() {
        let mut watchdog = Watchdog::new(Duration::from_millis(40));
        watchdog.start();
        assert!(watchdog.wait_expired(Duration::from_secs(5)));
        assert!(!watchdog.status());
    }

    #[test]
    fn wait_expired_times_out_while_healthy() {
        let mut watchdog = Watchdog::new(Duration::from_secs(10));
        watchdog.start();
        assert!(!watchdog.wait_expired(Duration::from_millis(50)));
        assert!(watchdog.status());
        watchdog.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let mut watchdog = Watchdog::new(Duration::from_millis(50));
        watchdog.stop();
        watchdog.start();
        watchdog.stop();
        watchdog.stop();
    }
}
