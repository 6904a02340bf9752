//! Decision-agent seam and the adapter the orchestrator drives.
//!
//! Each tick, the orchestrator asks the attached agent for one control
//! command for the primary actor. The agent reads its own cached sensor
//! state -- there is no explicit step argument -- and may take unbounded
//! wall-clock time, which is exactly what the watchdog is timing
//! against. Agent failures are not caught or retried: they propagate
//! and abort the run.

use std::time::Duration;

use tracing::debug;
use waypoint_types::{ActorId, Track, VehicleControl};

/// Errors raised by a decision agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The agent failed while binding to the primary actor.
    #[error("agent setup failed: {message}")]
    Setup {
        /// Description of the setup failure.
        message: String,
    },

    /// The agent failed while producing a control command.
    #[error("agent step failed: {message}")]
    Step {
        /// Description of the step failure.
        message: String,
    },

    /// The adapter was asked to step an agent that was already released.
    #[error("agent already released")]
    Released,
}

/// A decision module that drives the primary actor.
///
/// Implementations wrap whatever decision machinery the embedding
/// executor provides (a learned policy, a rule stack, a replay). All
/// calls happen on the orchestrator's control thread.
pub trait DrivingAgent {
    /// Bind to the primary actor before the run starts.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Setup`] if the agent cannot bind.
    fn setup(
        &mut self,
        ego: ActorId,
        debug_mode: bool,
        track: Option<Track>,
    ) -> Result<(), AgentError>;

    /// Produce one control command from the agent's own cached state.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Step`] if the agent cannot decide.
    fn run_step(&mut self) -> Result<VehicleControl, AgentError>;

    /// Release any resources held by the agent. Called at most once by
    /// the adapter.
    fn cleanup(&mut self);
}

/// Owning wrapper around a boxed agent.
///
/// Forwards setup and step calls while the agent is attached and makes
/// [`release`](Self::release) idempotent: the first call runs the
/// agent's cleanup and drops it, later calls are no-ops.
pub struct AgentAdapter {
    inner: Option<Box<dyn DrivingAgent + Send>>,
}

impl core::fmt::Debug for AgentAdapter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AgentAdapter")
            .field("released", &self.inner.is_none())
            .finish()
    }
}

impl AgentAdapter {
    /// Wrap an agent.
    pub fn new(agent: Box<dyn DrivingAgent + Send>) -> Self {
        Self { inner: Some(agent) }
    }

    /// Bind the wrapped agent to the primary actor.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Released`] if the agent was already
    /// released, or the agent's own setup error.
    pub fn setup(
        &mut self,
        ego: ActorId,
        debug_mode: bool,
        track: Option<Track>,
    ) -> Result<(), AgentError> {
        let agent = self.inner.as_mut().ok_or(AgentError::Released)?;
        agent.setup(ego, debug_mode, track)
    }

    /// Ask the wrapped agent for one control command.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Released`] if the agent was already
    /// released, or the agent's own step error.
    pub fn run_step(&mut self) -> Result<VehicleControl, AgentError> {
        let agent = self.inner.as_mut().ok_or(AgentError::Released)?;
        agent.run_step()
    }

    /// Run the agent's cleanup and drop it. Idempotent.
    pub fn release(&mut self) {
        if let Some(mut agent) = self.inner.take() {
            agent.cleanup();
            debug!("Agent released");
        }
    }

    /// Whether the agent has been released.
    pub const fn is_released(&self) -> bool {
        self.inner.is_none()
    }
}

// ---------------------------------------------------------------------------
// Stub agent
// ---------------------------------------------------------------------------

/// An agent that always returns the same control command.
///
/// Exercises the orchestration loop without any real decision machinery.
/// An optional per-step delay makes it useful for watchdog tests: a
/// delay longer than the watchdog timeout reproduces a stalled agent.
#[derive(Debug, Clone, Default)]
pub struct StubAgent {
    control: VehicleControl,
    step_delay: Option<Duration>,
    bound_to: Option<ActorId>,
    steps: u64,
    cleanups: u64,
}

impl StubAgent {
    /// Create a stub returning the given command every step.
    pub const fn new(control: VehicleControl) -> Self {
        Self {
            control,
            step_delay: None,
            bound_to: None,
            steps: 0,
            cleanups: 0,
        }
    }

    /// Sleep this long inside every `run_step` call.
    #[must_use]
    pub const fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    /// The actor this stub was bound to at setup, if any.
    pub const fn bound_to(&self) -> Option<ActorId> {
        self.bound_to
    }

    /// Number of steps executed so far.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of cleanup calls received.
    pub const fn cleanups(&self) -> u64 {
        self.cleanups
    }
}

impl DrivingAgent for StubAgent {
    fn setup(
        &mut self,
        ego: ActorId,
        _debug_mode: bool,
        _track: Option<Track>,
    ) -> Result<(), AgentError> {
        self.bound_to = Some(ego);
        Ok(())
    }

    fn run_step(&mut self) -> Result<VehicleControl, AgentError> {
        if let Some(delay) = self.step_delay {
            std::thread::sleep(delay);
        }
        self.steps = self.steps.saturating_add(1);
        Ok(self.control)
    }

    fn cleanup(&mut self) {
        self.cleanups = self.cleanups.saturating_add(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn adapter_forwards_setup_and_step() {
        let mut adapter = AgentAdapter::new(Box::new(StubAgent::new(VehicleControl {
            throttle: 0.4,
            ..VehicleControl::default()
        })));
        let ego = ActorId::new();
        adapter.setup(ego, false, Some(Track::Sensors)).unwrap();

        let control = adapter.run_step().unwrap();
        assert!((control.throttle - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn release_is_idempotent() {
        let mut adapter = AgentAdapter::new(Box::new(StubAgent::default()));
        assert!(!adapter.is_released());
        adapter.release();
        assert!(adapter.is_released());
        adapter.release();
        assert!(adapter.is_released());
    }

    #[test]
    fn step_after_release_is_an_error() {
        let mut adapter = AgentAdapter::new(Box::new(StubAgent::default()));
        adapter.release();
        assert!(matches!(adapter.run_step(), Err(AgentError::Released)));
    }

    #[test]
    fn stub_records_binding_and_steps() {
        let mut stub = StubAgent::default();
        let ego = ActorId::new();
        stub.setup(ego, true, None).unwrap();
        let _ = stub.run_step().unwrap();
        let _ = stub.run_step().unwrap();
        assert_eq!(stub.bound_to(), Some(ego));
        assert_eq!(stub.steps(), 2);
    }
}
