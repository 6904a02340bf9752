//! Behavior-evaluation seam and a scripted tree for exercising the loop.
//!
//! The scenario itself -- a hierarchical tree of condition and action
//! nodes built by the embedding executor -- is an external collaborator.
//! The orchestrator only needs four things from it: advance every node
//! one step, read the aggregate status, learn which actors are in play,
//! and signal termination when the run is stopped. [`ScenarioTree`] is
//! that narrow surface.

use std::sync::Arc;

use waypoint_types::{ActorId, TreeStatus};

use crate::metrics::MetricsBoard;

/// One loaded scenario's behavior evaluation tree.
///
/// All calls happen on the orchestrator's control thread. Tree failures
/// are not the orchestrator's to catch; implementations surface internal
/// faults through their status or their own channels.
pub trait ScenarioTree {
    /// Human-readable scenario name for logs.
    fn name(&self) -> &str;

    /// The controlled primary actor.
    fn ego_actor(&self) -> ActorId;

    /// Every actor in play (primary plus scripted traffic), for
    /// data-layer registration at load time.
    fn actors(&self) -> Vec<ActorId>;

    /// Advance all nodes one step.
    fn tick_once(&mut self);

    /// Aggregate status after the most recent tick.
    fn status(&self) -> TreeStatus;

    /// Ask the scenario to terminate (stop path). Idempotent.
    fn terminate(&mut self);
}

// ---------------------------------------------------------------------------
// Scripted tree
// ---------------------------------------------------------------------------

/// A tree that runs a fixed number of ticks, then reports a configured
/// terminal status.
///
/// When given a metrics board it behaves like a minimal criteria stack:
/// every tick it writes route completion proportional to progress and
/// zeroed violation counters. Used by the harness binary and the
/// orchestrator tests.
#[derive(Debug, Clone)]
pub struct ScriptedTree {
    name: String,
    ego: ActorId,
    others: Vec<ActorId>,
    duration_ticks: u32,
    terminal: TreeStatus,
    ticks: u32,
    terminated: bool,
    board: Option<Arc<MetricsBoard>>,
}

impl ScriptedTree {
    /// Create a tree that ends with `terminal` after `duration_ticks`
    /// ticks. A fresh ego actor ID is minted.
    pub fn new(name: impl Into<String>, duration_ticks: u32, terminal: TreeStatus) -> Self {
        Self {
            name: name.into(),
            ego: ActorId::new(),
            others: Vec::new(),
            duration_ticks: duration_ticks.max(1),
            terminal,
            ticks: 0,
            terminated: false,
            board: None,
        }
    }

    /// Attach a metrics board written on every tick.
    #[must_use]
    pub fn with_board(mut self, board: Arc<MetricsBoard>) -> Self {
        self.board = Some(board);
        self
    }

    /// Add scripted traffic actors alongside the ego.
    #[must_use]
    pub fn with_other_actors(mut self, others: Vec<ActorId>) -> Self {
        self.others = others;
        self
    }

    /// Number of ticks executed so far.
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Whether `terminate` was called.
    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn write_metrics(&self) {
        let Some(board) = self.board.as_ref() else {
            return;
        };
        let progress =
            (f64::from(self.ticks) / f64::from(self.duration_ticks) * 100.0).min(100.0);
        board.set_route_completion(progress);
        board.set_collisions(0);
        board.set_outside_route_lanes(0.0);
        board.set_stop_sign_violations(0);
        board.set_red_light_violations(0);
        board.set_in_route(true);
    }
}

impl ScenarioTree for ScriptedTree {
    fn name(&self) -> &str {
        &self.name
    }

    fn ego_actor(&self) -> ActorId {
        self.ego
    }

    fn actors(&self) -> Vec<ActorId> {
        let mut actors = Vec::with_capacity(self.others.len().saturating_add(1));
        actors.push(self.ego);
        actors.extend(self.others.iter().copied());
        actors
    }

    fn tick_once(&mut self) {
        if self.terminated {
            return;
        }
        self.ticks = self.ticks.saturating_add(1);
        self.write_metrics();
    }

    fn status(&self) -> TreeStatus {
        if self.ticks >= self.duration_ticks {
            self.terminal
        } else {
            TreeStatus::Running
        }
    }

    fn terminate(&mut self) {
        self.terminated = true;
    }
}
