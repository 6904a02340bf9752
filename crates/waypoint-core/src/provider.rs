//! Data-layer seam: actor registration, per-tick state, control output.
//!
//! The data layer caches actor and world state on behalf of everyone
//! else -- the orchestrator refreshes it once per tick, before the agent
//! reads sensors and the tree evaluates criteria. It is consumed, never
//! owned: the embedding executor decides what actually backs it.

use waypoint_types::{ActorId, SimTimestamp, VehicleControl};

/// The shared actor/world data layer.
///
/// All calls happen on the orchestrator's control thread, in the fixed
/// per-tick order: `refresh`, then control application.
pub trait DataProvider {
    /// Register the actors of a freshly loaded scenario.
    fn register_actors(&mut self, actors: &[ActorId]);

    /// Refresh cached actor/world state for a new timestamp.
    fn refresh(&mut self, timestamp: &SimTimestamp);

    /// Apply a control command to an actor.
    fn apply_control(&mut self, actor: ActorId, control: &VehicleControl);

    /// Point the debug spectator camera at an actor. Purely
    /// observational; must never affect the scenario outcome.
    fn focus_spectator(&mut self, actor: ActorId);

    /// Drop all registrations and cached state. Idempotent.
    fn cleanup(&mut self);
}

// ---------------------------------------------------------------------------
// Recording provider
// ---------------------------------------------------------------------------

/// A data provider that records every call for assertions.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataProvider {
    registered: Vec<ActorId>,
    refreshed_frames: Vec<u64>,
    controls: Vec<(ActorId, VehicleControl)>,
    spectator_focuses: Vec<ActorId>,
    cleanups: u64,
}

impl MemoryDataProvider {
    /// Create an empty recording provider.
    pub const fn new() -> Self {
        Self {
            registered: Vec::new(),
            refreshed_frames: Vec::new(),
            controls: Vec::new(),
            spectator_focuses: Vec::new(),
            cleanups: 0,
        }
    }

    /// Actors registered since construction (or the last cleanup).
    pub fn registered(&self) -> &[ActorId] {
        &self.registered
    }

    /// Frame numbers of every refresh received, in order.
    pub fn refreshed_frames(&self) -> &[u64] {
        &self.refreshed_frames
    }

    /// Control commands applied, in order.
    pub fn controls(&self) -> &[(ActorId, VehicleControl)] {
        &self.controls
    }

    /// Spectator focus calls, in order.
    pub fn spectator_focuses(&self) -> &[ActorId] {
        &self.spectator_focuses
    }

    /// Number of cleanup calls received.
    pub const fn cleanups(&self) -> u64 {
        self.cleanups
    }
}

impl DataProvider for MemoryDataProvider {
    fn register_actors(&mut self, actors: &[ActorId]) {
        self.registered.extend_from_slice(actors);
    }

    fn refresh(&mut self, timestamp: &SimTimestamp) {
        self.refreshed_frames.push(timestamp.frame);
    }

    fn apply_control(&mut self, actor: ActorId, control: &VehicleControl) {
        self.controls.push((actor, *control));
    }

    fn focus_spectator(&mut self, actor: ActorId) {
        self.spectator_focuses.push(actor);
    }

    fn cleanup(&mut self) {
        self.registered.clear();
        self.refreshed_frames.clear();
        self.controls.clear();
        self.spectator_focuses.clear();
        self.cleanups = self.cleanups.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(frame: u64) -> SimTimestamp {
        SimTimestamp {
            frame,
            elapsed_seconds: 0.05,
            delta_seconds: 0.05,
        }
    }

    #[test]
    fn records_calls_in_order() {
        let mut provider = MemoryDataProvider::new();
        let ego = ActorId::new();
        provider.register_actors(&[ego]);
        provider.refresh(&ts(1));
        provider.refresh(&ts(2));
        provider.apply_control(ego, &VehicleControl::default());

        assert_eq!(provider.registered(), &[ego]);
        assert_eq!(provider.refreshed_frames(), &[1, 2]);
        assert_eq!(provider.controls().len(), 1);
    }

    #[test]
    fn cleanup_clears_recordings_and_counts() {
        let mut provider = MemoryDataProvider::new();
        provider.register_actors(&[ActorId::new()]);
        provider.cleanup();
        provider.cleanup();

        assert!(provider.registered().is_empty());
        assert_eq!(provider.cleanups(), 2);
    }
}
