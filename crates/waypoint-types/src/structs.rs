//! Plain data structs shared between the orchestration core and
//! embedding executors.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Simulation timestamps
// ---------------------------------------------------------------------------

/// One discrete snapshot timestamp from the external simulation server.
///
/// Timestamps are opaque to the harness apart from `elapsed_seconds`:
/// the orchestrator only runs a tick cycle for a timestamp whose
/// `elapsed_seconds` is strictly greater than the last one it processed,
/// which filters out duplicate and stale snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimTimestamp {
    /// Server-side frame counter for this snapshot.
    pub frame: u64,
    /// Simulation seconds elapsed since the server started.
    pub elapsed_seconds: f64,
    /// Simulation seconds covered by this single step.
    pub delta_seconds: f64,
}

// ---------------------------------------------------------------------------
// Vehicle control
// ---------------------------------------------------------------------------

/// One control command for the primary actor, produced by the decision
/// agent each tick and applied through the data layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleControl {
    /// Forward throttle in `[0, 1]`.
    pub throttle: f64,
    /// Steering angle in `[-1, 1]`.
    pub steer: f64,
    /// Brake pedal in `[0, 1]`.
    pub brake: f64,
    /// Whether the hand brake is engaged.
    pub hand_brake: bool,
    /// Whether reverse gear is selected.
    pub reverse: bool,
}

impl Default for VehicleControl {
    /// A neutral command: no throttle, no steering, no brakes.
    fn default() -> Self {
        Self {
            throttle: 0.0,
            steer: 0.0,
            brake: 0.0,
            hand_brake: false,
            reverse: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics snapshot
// ---------------------------------------------------------------------------

/// Point-in-time copy of the scenario metrics board.
///
/// Written incrementally by the behavior evaluation tree during ticks
/// and read exactly once by the reporter after the loop ends. Every
/// field is optional: a criterion that never ran leaves its field
/// `None`, which the reporter treats as "report unavailable" -- never
/// as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Percentage of the route completed (0-100, may slightly overshoot).
    pub route_completion: Option<f64>,
    /// Number of collisions recorded.
    pub collisions: Option<u64>,
    /// Percentage of the route driven outside the route lanes.
    pub outside_route_lanes: Option<f64>,
    /// Number of stop signs run.
    pub stop_sign_violations: Option<u64>,
    /// Number of red lights run.
    pub red_light_violations: Option<u64>,
    /// Whether the actor was still on the route when the run ended.
    pub in_route: Option<bool>,
}

impl MetricsSnapshot {
    /// Whether every metric required for scoring is present.
    pub const fn is_scorable(&self) -> bool {
        self.route_completion.is_some()
            && self.collisions.is_some()
            && self.outside_route_lanes.is_some()
            && self.stop_sign_violations.is_some()
            && self.red_light_violations.is_some()
            && self.in_route.is_some()
    }
}

// ---------------------------------------------------------------------------
// Durations
// ---------------------------------------------------------------------------

/// Wall-clock and simulation-clock duration of one scenario run.
///
/// Computed once from start/end samples of each clock when the loop
/// exits; never mutated afterward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDurations {
    /// Seconds of system (wall-clock) time the run took.
    pub system_seconds: f64,
    /// Seconds of simulation time the run covered.
    pub game_seconds: f64,
}
