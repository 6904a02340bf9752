//! Clock-source seam and simulation-time tracking.
//!
//! The external simulation server is the only source of discrete time.
//! [`ClockSource`] is the narrow seam the orchestrator consumes:
//! [`poll`](ClockSource::poll) fetches the latest snapshot timestamp (or
//! nothing, in which case the caller busy-polls), and
//! [`advance`](ClockSource::advance) requests exactly one synchronized
//! server step. No ordering normalization happens here -- filtering out
//! duplicate and stale timestamps is the orchestrator's job.
//!
//! [`ScenarioClock`] is the harness-owned simulation-time tracker fed
//! from the processed timestamps; it supplies the game half of the
//! run-duration pair.

use std::collections::VecDeque;

use waypoint_types::SimTimestamp;

/// Errors that can occur when talking to the external clock source.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The server rejected or failed a synchronized advance request.
    #[error("clock advance failed: {message}")]
    Advance {
        /// Description of the failure from the clock source.
        message: String,
    },
}

/// The external discrete-time source.
///
/// Implementations wrap whatever transport reaches the simulation
/// server. Both calls are made from the orchestrator's control thread
/// only.
pub trait ClockSource {
    /// Return the latest snapshot timestamp, or `None` if the server has
    /// no snapshot yet. Must not block; the orchestrator busy-polls.
    fn poll(&mut self) -> Option<SimTimestamp>;

    /// Request one synchronized simulation step. Returns once the server
    /// has consumed the step, so the next [`poll`](Self::poll) observes
    /// a fresh timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Advance`] if the server fails the step.
    fn advance(&mut self) -> Result<(), ClockError>;
}

// ---------------------------------------------------------------------------
// Scenario clock
// ---------------------------------------------------------------------------

/// Simulation-time tracker fed from processed timestamps.
///
/// Records the latest timestamp the orchestrator accepted. Restarted at
/// load time; read at loop end for the simulation-clock half of the
/// duration pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioClock {
    start_elapsed: Option<f64>,
    current: Option<SimTimestamp>,
}

impl ScenarioClock {
    /// Create a clock with no time observed yet.
    pub const fn new() -> Self {
        Self {
            start_elapsed: None,
            current: None,
        }
    }

    /// Forget all observed time (called on scenario reload).
    pub const fn restart(&mut self) {
        self.start_elapsed = None;
        self.current = None;
    }

    /// Record a processed timestamp. The first one becomes the run's
    /// simulation-time origin.
    pub const fn on_tick(&mut self, timestamp: &SimTimestamp) {
        if self.start_elapsed.is_none() {
            self.start_elapsed = Some(timestamp.elapsed_seconds);
        }
        self.current = Some(*timestamp);
    }

    /// Simulation seconds of the latest processed timestamp (0 before
    /// the first tick).
    pub fn elapsed_seconds(&self) -> f64 {
        self.current.map_or(0.0, |ts| ts.elapsed_seconds)
    }

    /// Simulation seconds covered since the first processed timestamp.
    pub fn run_seconds(&self) -> f64 {
        match (self.start_elapsed, self.current) {
            (Some(start), Some(current)) => current.elapsed_seconds - start,
            _ => 0.0,
        }
    }

    /// Frame counter of the latest processed timestamp.
    pub fn frame(&self) -> Option<u64> {
        self.current.map(|ts| ts.frame)
    }
}

// ---------------------------------------------------------------------------
// Scripted sources
// ---------------------------------------------------------------------------

/// A clock source that replays a fixed list of timestamps.
///
/// Each [`poll`](ClockSource::poll) consumes the next scripted entry
/// (including deliberate duplicates and regressions, for filter tests)
/// and returns `None` once the script is exhausted. `advance()` only
/// counts calls.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClockSource {
    script: VecDeque<SimTimestamp>,
    advance_count: u64,
}

impl ScriptedClockSource {
    /// Create a source replaying the given timestamps in order.
    pub fn new(script: Vec<SimTimestamp>) -> Self {
        Self {
            script: script.into(),
            advance_count: 0,
        }
    }

    /// Build a script of `count` timestamps spaced `delta_seconds` apart,
    /// starting at `delta_seconds`.
    pub fn with_fixed_step(count: u32, delta_seconds: f64) -> Self {
        let script = (1..=count)
            .map(|index| SimTimestamp {
                frame: u64::from(index),
                elapsed_seconds: f64::from(index) * delta_seconds,
                delta_seconds,
            })
            .collect();
        Self::new(script)
    }

    /// Number of advance requests received so far.
    pub const fn advance_count(&self) -> u64 {
        self.advance_count
    }
}

impl ClockSource for ScriptedClockSource {
    fn poll(&mut self) -> Option<SimTimestamp> {
        self.script.pop_front()
    }

    fn advance(&mut self) -> Result<(), ClockError> {
        self.advance_count = self.advance_count.saturating_add(1);
        Ok(())
    }
}

/// A clock source that behaves like a server in synchronous mode.
///
/// [`poll`](ClockSource::poll) keeps returning the current snapshot
/// until an [`advance`](ClockSource::advance) produces the next one,
/// `delta_seconds` later. The initial snapshot exists from construction,
/// matching a server that has already completed its first step.
#[derive(Debug, Clone)]
pub struct SteppingClockSource {
    current: SimTimestamp,
    delta_seconds: f64,
    advance_count: u64,
}

impl SteppingClockSource {
    /// Create a stepping source with the given per-step simulation delta.
    pub const fn new(delta_seconds: f64) -> Self {
        Self {
            current: SimTimestamp {
                frame: 1,
                elapsed_seconds: delta_seconds,
                delta_seconds,
            },
            delta_seconds,
            advance_count: 0,
        }
    }

    /// Number of advance requests received so far.
    pub const fn advance_count(&self) -> u64 {
        self.advance_count
    }
}

impl ClockSource for SteppingClockSource {
    fn poll(&mut self) -> Option<SimTimestamp> {
        Some(self.current)
    }

    fn advance(&mut self) -> Result<(), ClockError> {
        self.advance_count = self.advance_count.saturating_add(1);
        self.current = SimTimestamp {
            frame: self.current.frame.saturating_add(1),
            elapsed_seconds: self.current.elapsed_seconds + self.delta_seconds,
            delta_seconds: self.delta_seconds,
        };
        Ok(())
    }
}
