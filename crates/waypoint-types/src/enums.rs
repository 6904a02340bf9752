//! Enumeration types for the Waypoint scenario harness.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Behavior tree status
// ---------------------------------------------------------------------------

/// Aggregate status of the behavior evaluation tree.
///
/// Owned by the evaluation collaborator; the orchestrator and the
/// reporter only ever read it. The orchestration loop keeps running
/// while the status is [`Running`](Self::Running) and exits on the first
/// terminal value it observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TreeStatus {
    /// The tree has not reached a terminal node yet.
    Running,
    /// All success criteria were met.
    Success,
    /// A failure criterion fired.
    Failure,
}

impl TreeStatus {
    /// Whether this status ends the scenario run.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of the tick orchestrator.
///
/// Transitions: `Idle -> Running -> Stopped`, reset to `Idle` on an
/// explicit reload. Mutated only by the orchestrator's own loop and by
/// the stop path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// No scenario loaded, or reset after a reload.
    Idle,
    /// The orchestration loop is executing.
    Running,
    /// The run finished or was stopped.
    Stopped,
}

// ---------------------------------------------------------------------------
// Agent track
// ---------------------------------------------------------------------------

/// Track identifier handed to the decision agent at setup time.
///
/// Selects which input modality the agent is entitled to: raw sensor
/// streams only, or sensors plus the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// Sensor data only.
    Sensors,
    /// Sensor data plus map access.
    Map,
}
