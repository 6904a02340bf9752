//! The tick orchestrator: load, run, and stop one scripted scenario.
//!
//! [`ScenarioManager`] owns the control loop that synchronizes the
//! external clock source, the behavior evaluation tree, the optional
//! decision agent, and the watchdog. Each cycle runs in a fixed order --
//! watchdog refresh, clock update and data refresh, agent step, tree
//! tick, control application -- followed by exactly one synchronized
//! advance request to the external clock. Simulation correctness
//! depends on that ordering, so the loop is deliberately a strict,
//! single-consumer pipeline: no work queue, no thread pool, no retries.
//!
//! A cycle only runs for a timestamp strictly newer than the last one
//! processed; duplicate and regressed snapshots are ignored. The loop
//! exits when the tree leaves its running status, when a stop is
//! requested through the [`StopToken`], or fatally when the watchdog
//! expires.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use waypoint_types::{
    MetricsSnapshot, RunId, RunState, ScenarioDurations, SimTimestamp, TreeStatus,
};

use crate::agent::{AgentAdapter, AgentError, DrivingAgent};
use crate::behavior::ScenarioTree;
use crate::clock::{ClockError, ClockSource, ScenarioClock};
use crate::config::ScenarioConfig;
use crate::control::StopToken;
use crate::metrics::MetricsBoard;
use crate::provider::DataProvider;
use crate::watchdog::Watchdog;

/// Errors that can occur while orchestrating a scenario run.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The watchdog expired: the loop went longer than the configured
    /// timeout without proof of life. Fatal; distinct from a clean stop.
    #[error("scenario stalled: no watchdog refresh within {timeout_seconds} seconds")]
    StallTimeout {
        /// The configured watchdog timeout in seconds.
        timeout_seconds: f64,
    },

    /// The decision agent failed.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// The external clock source failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// `run` was called with no scenario loaded.
    #[error("no scenario loaded")]
    NotLoaded,

    /// The configured watchdog timeout is not a valid duration.
    #[error("invalid watchdog timeout: {seconds} seconds")]
    InvalidTimeout {
        /// The rejected timeout value.
        seconds: f64,
    },
}

/// Terminal outcome of one scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScenarioOutcome {
    /// The tree reached its success status.
    Success,
    /// The tree reached its failure status.
    Failure,
    /// The loop exited before the tree reached a terminal status
    /// (manual stop). Reported as inconclusive, never scored.
    Aborted,
}

/// Result of one completed (non-fatal) scenario run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScenarioResult {
    /// Identifier minted for this run.
    pub run_id: RunId,
    /// Terminal outcome derived from the final tree status.
    pub outcome: ScenarioOutcome,
    /// The tree status observed when the loop exited.
    pub tree_status: TreeStatus,
    /// Snapshot of the metrics board, taken once at loop end.
    pub metrics: MetricsSnapshot,
    /// Wall-clock and simulation-clock duration of the run.
    pub durations: ScenarioDurations,
    /// Number of tick cycles executed.
    pub ticks_executed: u64,
}

/// The tick orchestrator.
///
/// Lifecycle: [`load`](Self::load) registers a scenario and transitions
/// back to `Idle` (run-ready); [`run`](Self::run) drives the loop to a
/// terminal state; [`stop`](Self::stop) is callable from any state and
/// idempotent.
pub struct ScenarioManager {
    config: ScenarioConfig,
    watchdog: Watchdog,
    clock: ScenarioClock,
    metrics: Arc<MetricsBoard>,
    stop_token: Arc<StopToken>,
    tree: Option<Box<dyn ScenarioTree + Send>>,
    agent: Option<AgentAdapter>,
    state: RunState,
    last_elapsed: f64,
    durations: Option<ScenarioDurations>,
}

impl core::fmt::Debug for ScenarioManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScenarioManager")
            .field("state", &self.state)
            .field("loaded", &self.tree.is_some())
            .field("agent", &self.agent.is_some())
            .field("last_elapsed", &self.last_elapsed)
            .finish()
    }
}

impl ScenarioManager {
    /// Create a manager from scenario configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::InvalidTimeout`] if the configured
    /// watchdog timeout is negative, infinite, or NaN.
    pub fn new(config: ScenarioConfig) -> Result<Self, ScenarioError> {
        let timeout = std::time::Duration::try_from_secs_f64(config.watchdog_timeout_seconds)
            .map_err(|_err| ScenarioError::InvalidTimeout {
                seconds: config.watchdog_timeout_seconds,
            })?;
        Ok(Self {
            config,
            watchdog: Watchdog::new(timeout),
            clock: ScenarioClock::new(),
            metrics: Arc::new(MetricsBoard::new()),
            stop_token: Arc::new(StopToken::new()),
            tree: None,
            agent: None,
            state: RunState::Idle,
            last_elapsed: 0.0,
            durations: None,
        })
    }

    /// Handle to the shared metrics board, for wiring into the tree's
    /// criteria nodes before [`load`](Self::load).
    pub fn metrics_board(&self) -> Arc<MetricsBoard> {
        Arc::clone(&self.metrics)
    }

    /// Handle to the stop token, for external interrupt sources.
    pub fn stop_token(&self) -> Arc<StopToken> {
        Arc::clone(&self.stop_token)
    }

    /// Current lifecycle state.
    pub const fn run_state(&self) -> RunState {
        self.state
    }

    /// Duration pair of the last completed run, if any.
    pub const fn durations(&self) -> Option<ScenarioDurations> {
        self.durations
    }

    /// Load a new scenario, replacing any previous one.
    ///
    /// Resets all per-run state (timestamp filter, clocks, metrics,
    /// pending stop), wraps the agent if one is provided and binds it to
    /// the tree's primary actor, and registers the tree's actors with
    /// the data layer.
    ///
    /// # Errors
    ///
    /// Propagates the agent's setup error.
    pub fn load(
        &mut self,
        tree: Box<dyn ScenarioTree + Send>,
        agent: Option<Box<dyn DrivingAgent + Send>>,
        provider: &mut dyn DataProvider,
    ) -> Result<(), ScenarioError> {
        self.state = RunState::Idle;
        self.last_elapsed = 0.0;
        self.durations = None;
        self.clock.restart();
        self.metrics.reset();
        self.stop_token.reset();

        let mut adapter = agent.map(AgentAdapter::new);
        if let Some(adapter) = adapter.as_mut() {
            adapter.setup(tree.ego_actor(), self.config.debug_mode, self.config.track)?;
        }
        provider.register_actors(&tree.actors());

        info!(scenario = tree.name(), agent = adapter.is_some(), "Scenario loaded");
        self.agent = adapter;
        self.tree = Some(tree);
        Ok(())
    }

    /// Run the loaded scenario until the tree reaches a terminal status
    /// or a stop is requested.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::NotLoaded`] without a prior `load`,
    /// [`ScenarioError::StallTimeout`] on watchdog expiry, and
    /// propagates agent and clock failures. The watchdog is stopped and
    /// the duration pair is recorded on every exit path.
    pub fn run(
        &mut self,
        source: &mut dyn ClockSource,
        provider: &mut dyn DataProvider,
    ) -> Result<ScenarioResult, ScenarioError> {
        let name = match self.tree.as_ref() {
            Some(tree) => tree.name().to_owned(),
            None => return Err(ScenarioError::NotLoaded),
        };
        let run_id = RunId::new();
        info!(%run_id, scenario = %name, "Running scenario");

        let start_system = Utc::now();
        let start_game = self.clock.elapsed_seconds();
        self.watchdog.start();
        self.state = RunState::Running;

        let loop_result = self.drive_loop(source, provider);

        self.watchdog.stop();
        let system_seconds = Utc::now()
            .signed_duration_since(start_system)
            .to_std()
            .map_or(0.0, |duration| duration.as_secs_f64());
        let game_seconds = self.clock.elapsed_seconds() - start_game;
        let durations = ScenarioDurations {
            system_seconds,
            game_seconds,
        };
        self.durations = Some(durations);
        self.state = RunState::Stopped;

        let ticks_executed = loop_result?;

        let tree_status = self
            .tree
            .as_ref()
            .map_or(TreeStatus::Running, |tree| tree.status());
        let outcome = match tree_status {
            TreeStatus::Success => ScenarioOutcome::Success,
            TreeStatus::Failure => ScenarioOutcome::Failure,
            TreeStatus::Running => ScenarioOutcome::Aborted,
        };

        info!(
            %run_id,
            ?outcome,
            ticks_executed,
            system_seconds = durations.system_seconds,
            game_seconds = durations.game_seconds,
            "Scenario run ended"
        );

        Ok(ScenarioResult {
            run_id,
            outcome,
            tree_status,
            metrics: self.metrics.snapshot(),
            durations,
            ticks_executed,
        })
    }

    /// Stop the scenario: terminate the tree, release the agent, and
    /// clear data-layer registrations. Callable from any state,
    /// idempotent.
    pub fn stop(&mut self, provider: &mut dyn DataProvider) {
        if let Some(tree) = self.tree.as_mut() {
            tree.terminate();
        }
        if let Some(agent) = self.agent.as_mut() {
            agent.release();
        }
        self.agent = None;
        provider.cleanup();
        self.state = RunState::Stopped;
    }

    /// The loop proper. Returns the number of tick cycles executed.
    fn drive_loop(
        &mut self,
        source: &mut dyn ClockSource,
        provider: &mut dyn DataProvider,
    ) -> Result<u64, ScenarioError> {
        let mut ticks: u64 = 0;
        loop {
            // Cancellation and liveness are observed once per iteration
            // boundary; in-flight agent and tree calls always complete.
            if self.stop_token.is_stop_requested() {
                if !self.watchdog.status() {
                    warn!("Stop requested after watchdog expiry");
                    return Err(self.stall_error());
                }
                info!("Stop requested, ending scenario run");
                return Ok(ticks);
            }
            if !self.watchdog.status() {
                return Err(self.stall_error());
            }

            let mut still_running = true;
            let mut processed = false;
            if let Some(timestamp) = source.poll() {
                if timestamp.elapsed_seconds > self.last_elapsed {
                    self.last_elapsed = timestamp.elapsed_seconds;
                    still_running = self.tick_cycle(timestamp, provider)?;
                    processed = true;
                    ticks = ticks.saturating_add(1);
                }
            } else {
                std::thread::yield_now();
            }

            // Synchronized handshake: consume exactly one simulation
            // step per processed tick, and only while the run is live.
            if processed && still_running && self.agent.is_some() && self.watchdog.status() {
                source.advance()?;
            }

            if !still_running {
                return Ok(ticks);
            }
        }
    }

    /// One tick cycle for a strictly newer timestamp. Returns whether
    /// the loop should keep running.
    fn tick_cycle(
        &mut self,
        timestamp: SimTimestamp,
        provider: &mut dyn DataProvider,
    ) -> Result<bool, ScenarioError> {
        debug!(
            frame = timestamp.frame,
            elapsed_seconds = timestamp.elapsed_seconds,
            "Tick"
        );

        // 1. Proof of life.
        self.watchdog.update();

        // 2. Advance simulation time and refresh cached world state.
        self.clock.on_tick(&timestamp);
        provider.refresh(&timestamp);

        // 3. Agent decision. Unbounded wall-clock time; the watchdog is
        //    timing exactly this.
        let command = match self.agent.as_mut() {
            Some(agent) => Some(agent.run_step()?),
            None => None,
        };

        // 4. Evaluate the tree once.
        let tree = self.tree.as_mut().ok_or(ScenarioError::NotLoaded)?;
        tree.tick_once();
        let status = tree.status();

        // 5. A terminal status ends the loop after this cycle.
        let still_running = !status.is_terminal();
        if !still_running {
            info!(?status, "Scenario tree reached a terminal status");
        }

        // 6. Debug side effect, skipped on the terminal cycle.
        let ego = tree.ego_actor();
        if still_running && self.config.debug_mode {
            provider.focus_spectator(ego);
        }

        // 7. Apply the agent's command to the primary actor.
        if let Some(command) = command {
            provider.apply_control(ego, &command);
        }

        Ok(still_running)
    }

    fn stall_error(&self) -> ScenarioError {
        ScenarioError::StallTimeout {
            timeout_seconds: self.watchdog.timeout().as_secs_f64(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use waypoint_types::{ActorId, VehicleControl};

    use super::*;
    use crate::agent::StubAgent;
    use crate::behavior::ScriptedTree;
    use crate::clock::{ScriptedClockSource, SteppingClockSource};
    use crate::provider::MemoryDataProvider;

    fn test_config() -> ScenarioConfig {
        ScenarioConfig {
            watchdog_timeout_seconds: 5.0,
            debug_mode: false,
            track: None,
        }
    }

    fn ts(frame: u64, elapsed: f64) -> SimTimestamp {
        SimTimestamp {
            frame,
            elapsed_seconds: elapsed,
            delta_seconds: 0.05,
        }
    }

    #[test]
    fn run_without_load_is_an_error() {
        let mut manager = ScenarioManager::new(test_config()).unwrap();
        let mut source = SteppingClockSource::new(0.05);
        let mut provider = MemoryDataProvider::new();
        assert!(matches!(
            manager.run(&mut source, &mut provider),
            Err(ScenarioError::NotLoaded)
        ));
    }

    #[test]
    fn invalid_watchdog_timeout_is_rejected() {
        let config = ScenarioConfig {
            watchdog_timeout_seconds: -1.0,
            ..test_config()
        };
        assert!(matches!(
            ScenarioManager::new(config),
            Err(ScenarioError::InvalidTimeout { .. })
        ));
    }

    #[test]
    fn full_run_reaches_success_and_scores() {
        let mut manager = ScenarioManager::new(test_config()).unwrap();
        let board = manager.metrics_board();
        let tree = ScriptedTree::new("demo-route", 5, TreeStatus::Success).with_board(board);
        let agent = StubAgent::new(VehicleControl {
            throttle: 0.3,
            ..VehicleControl::default()
        });
        let mut source = SteppingClockSource::new(0.05);
        let mut provider = MemoryDataProvider::new();

        manager
            .load(Box::new(tree), Some(Box::new(agent)), &mut provider)
            .unwrap();
        let result = manager.run(&mut source, &mut provider).unwrap();

        assert_eq!(result.outcome, ScenarioOutcome::Success);
        assert_eq!(result.tree_status, TreeStatus::Success);
        assert_eq!(result.ticks_executed, 5);
        assert!(result.metrics.is_scorable());
        assert_eq!(result.metrics.route_completion, Some(100.0));
        assert_eq!(manager.run_state(), RunState::Stopped);

        // One control application per cycle, none of them spectator
        // follows (debug mode off).
        assert_eq!(provider.controls().len(), 5);
        assert!(provider.spectator_focuses().is_empty());
    }

    #[test]
    fn advance_happens_once_per_processed_tick_while_running() {
        let mut manager = ScenarioManager::new(test_config()).unwrap();
        let tree = ScriptedTree::new("demo", 5, TreeStatus::Success);
        let mut source = SteppingClockSource::new(0.05);
        let mut provider = MemoryDataProvider::new();

        manager
            .load(
                Box::new(tree),
                Some(Box::new(StubAgent::default())),
                &mut provider,
            )
            .unwrap();
        let result = manager.run(&mut source, &mut provider).unwrap();

        // Five cycles ran; the terminal cycle clears the running flag
        // before the handshake, so the server stepped four times.
        assert_eq!(result.ticks_executed, 5);
        assert_eq!(source.advance_count(), 4);
    }

    #[test]
    fn duplicate_and_regressed_timestamps_never_tick() {
        let mut manager = ScenarioManager::new(test_config()).unwrap();
        let tree = ScriptedTree::new("demo", 3, TreeStatus::Success);
        let mut source = ScriptedClockSource::new(vec![
            ts(1, 1.0),
            ts(1, 1.0),
            ts(0, 0.5),
            ts(2, 2.0),
            ts(2, 2.0),
            ts(3, 3.0),
        ]);
        let mut provider = MemoryDataProvider::new();

        manager.load(Box::new(tree), None, &mut provider).unwrap();
        let result = manager.run(&mut source, &mut provider).unwrap();

        assert_eq!(result.ticks_executed, 3);
        assert_eq!(provider.refreshed_frames(), &[1, 2, 3]);
        // Without an agent the external clock is driven elsewhere.
        assert_eq!(source.advance_count(), 0);
    }

    #[test]
    fn stop_request_with_live_watchdog_stops_cleanly() {
        let mut manager = ScenarioManager::new(test_config()).unwrap();
        let tree = ScriptedTree::new("demo", 100, TreeStatus::Success);
        let mut source = SteppingClockSource::new(0.05);
        let mut provider = MemoryDataProvider::new();

        manager.load(Box::new(tree), None, &mut provider).unwrap();
        manager.stop_token().request_stop();
        let result = manager.run(&mut source, &mut provider).unwrap();

        assert_eq!(result.outcome, ScenarioOutcome::Aborted);
        assert_eq!(result.tree_status, TreeStatus::Running);
        assert_eq!(result.ticks_executed, 0);
        assert_eq!(manager.run_state(), RunState::Stopped);
    }

    #[test]
    fn watchdog_expiry_is_a_fatal_stall() {
        let config = ScenarioConfig {
            watchdog_timeout_seconds: 0.05,
            ..test_config()
        };
        let mut manager = ScenarioManager::new(config).unwrap();
        let tree = ScriptedTree::new("demo", 100, TreeStatus::Success);
        let agent = StubAgent::default().with_step_delay(Duration::from_millis(300));
        let mut source = SteppingClockSource::new(0.05);
        let mut provider = MemoryDataProvider::new();

        manager
            .load(Box::new(tree), Some(Box::new(agent)), &mut provider)
            .unwrap();
        let result = manager.run(&mut source, &mut provider);

        assert!(matches!(result, Err(ScenarioError::StallTimeout { .. })));
        assert_eq!(manager.run_state(), RunState::Stopped);
        // The handshake never fires once the watchdog is dead.
        assert_eq!(source.advance_count(), 0);
    }

    #[test]
    fn stop_request_after_expiry_is_still_fatal() {
        let config = ScenarioConfig {
            watchdog_timeout_seconds: 0.05,
            ..test_config()
        };
        let mut manager = ScenarioManager::new(config).unwrap();
        let tree = ScriptedTree::new("demo", 100, TreeStatus::Success);
        let agent = StubAgent::default().with_step_delay(Duration::from_millis(300));
        let mut source = SteppingClockSource::new(0.05);
        let mut provider = MemoryDataProvider::new();

        manager
            .load(Box::new(tree), Some(Box::new(agent)), &mut provider)
            .unwrap();

        // Interrupt arrives while the agent is stalled, after the
        // watchdog has already expired.
        let token = manager.stop_token();
        let interrupter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            token.request_stop();
        });

        let result = manager.run(&mut source, &mut provider);
        interrupter.join().unwrap();

        assert!(matches!(result, Err(ScenarioError::StallTimeout { .. })));
    }

    #[test]
    fn debug_spectator_follow_skips_the_terminal_cycle() {
        let config = ScenarioConfig {
            debug_mode: true,
            ..test_config()
        };
        let mut manager = ScenarioManager::new(config).unwrap();
        let tree = ScriptedTree::new("demo", 2, TreeStatus::Success);
        let mut source = SteppingClockSource::new(0.05);
        let mut provider = MemoryDataProvider::new();

        manager
            .load(
                Box::new(tree),
                Some(Box::new(StubAgent::default())),
                &mut provider,
            )
            .unwrap();
        let result = manager.run(&mut source, &mut provider).unwrap();

        assert_eq!(result.ticks_executed, 2);
        // Spectator follow ran on the first cycle only; control
        // application ran on both.
        assert_eq!(provider.spectator_focuses().len(), 1);
        assert_eq!(provider.controls().len(), 2);
    }

    #[test]
    fn game_duration_comes_from_processed_timestamps() {
        let mut manager = ScenarioManager::new(test_config()).unwrap();
        let tree = ScriptedTree::new("demo", 4, TreeStatus::Success);
        let mut source = SteppingClockSource::new(0.1);
        let mut provider = MemoryDataProvider::new();

        manager
            .load(
                Box::new(tree),
                Some(Box::new(StubAgent::default())),
                &mut provider,
            )
            .unwrap();
        let result = manager.run(&mut source, &mut provider).unwrap();

        // Four steps of 0.1 s, starting from the initial 0.1 s snapshot.
        assert!((result.durations.game_seconds - 0.4).abs() < 1e-9);
        assert!(result.durations.system_seconds >= 0.0);
        let recorded = manager.durations().unwrap();
        assert!((recorded.game_seconds - result.durations.game_seconds).abs() < f64::EPSILON);
    }

    #[test]
    fn reload_resets_the_timestamp_filter() {
        let mut manager = ScenarioManager::new(test_config()).unwrap();
        let mut provider = MemoryDataProvider::new();

        let tree = ScriptedTree::new("first", 2, TreeStatus::Success);
        let mut source = ScriptedClockSource::new(vec![ts(1, 1.0), ts(2, 2.0)]);
        manager.load(Box::new(tree), None, &mut provider).unwrap();
        let first = manager.run(&mut source, &mut provider).unwrap();
        assert_eq!(first.ticks_executed, 2);

        // Same timestamps again: a reload must accept them afresh.
        let tree = ScriptedTree::new("second", 2, TreeStatus::Failure);
        let mut source = ScriptedClockSource::new(vec![ts(1, 1.0), ts(2, 2.0)]);
        manager.load(Box::new(tree), None, &mut provider).unwrap();
        assert_eq!(manager.run_state(), RunState::Idle);
        let second = manager.run(&mut source, &mut provider).unwrap();

        assert_eq!(second.ticks_executed, 2);
        assert_eq!(second.outcome, ScenarioOutcome::Failure);
    }

    #[test]
    fn stop_is_idempotent_and_releases_collaborators() {
        let mut manager = ScenarioManager::new(test_config()).unwrap();
        let tree = ScriptedTree::new("demo", 10, TreeStatus::Success);
        let mut provider = MemoryDataProvider::new();

        manager
            .load(
                Box::new(tree),
                Some(Box::new(StubAgent::default())),
                &mut provider,
            )
            .unwrap();
        assert_eq!(provider.registered().len(), 1);

        manager.stop(&mut provider);
        manager.stop(&mut provider);

        assert_eq!(manager.run_state(), RunState::Stopped);
        assert_eq!(provider.cleanups(), 2);
        assert!(provider.registered().is_empty());
    }

    #[test]
    fn load_registers_all_scenario_actors() {
        let mut manager = ScenarioManager::new(test_config()).unwrap();
        let others = vec![ActorId::new(), ActorId::new()];
        let tree =
            ScriptedTree::new("demo", 2, TreeStatus::Success).with_other_actors(others);
        let mut provider = MemoryDataProvider::new();

        manager.load(Box::new(tree), None, &mut provider).unwrap();
        assert_eq!(provider.registered().len(), 3);
    }
}
