//! Typed scenario metrics accumulator.
//!
//! The behavior evaluation tree writes named scenario metrics while it
//! ticks; the reporter reads them exactly once, as a snapshot, after the
//! loop ends. [`MetricsBoard`] replaces a stringly-keyed global
//! blackboard with an explicit, typed object shared by [`Arc`]: the
//! embedding executor clones the handle into its criteria nodes, and the
//! orchestrator keeps one for the final snapshot.
//!
//! A metric that is never written stays `None` in the snapshot, which
//! the reporter treats as "report unavailable" -- never as zero.
//!
//! [`Arc`]: std::sync::Arc

use std::sync::{Mutex, MutexGuard, PoisonError};

use waypoint_types::MetricsSnapshot;

/// Shared, typed scenario metrics store.
#[derive(Debug, Default)]
pub struct MetricsBoard {
    inner: Mutex<MetricsSnapshot>,
}

impl MetricsBoard {
    /// Create an empty board (all metrics unset).
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the route completion percentage.
    pub fn set_route_completion(&self, percent: f64) {
        self.lock().route_completion = Some(percent);
    }

    /// Record the collision count.
    pub fn set_collisions(&self, count: u64) {
        self.lock().collisions = Some(count);
    }

    /// Record the percentage driven outside the route lanes.
    pub fn set_outside_route_lanes(&self, percent: f64) {
        self.lock().outside_route_lanes = Some(percent);
    }

    /// Record the number of stop signs run.
    pub fn set_stop_sign_violations(&self, count: u64) {
        self.lock().stop_sign_violations = Some(count);
    }

    /// Record the number of red lights run.
    pub fn set_red_light_violations(&self, count: u64) {
        self.lock().red_light_violations = Some(count);
    }

    /// Record whether the actor is still on the route.
    pub fn set_in_route(&self, in_route: bool) {
        self.lock().in_route = Some(in_route);
    }

    /// Copy the current state of every metric.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.lock().clone()
    }

    /// Clear every metric back to unset (scenario reload).
    pub fn reset(&self) {
        *self.lock() = MetricsSnapshot::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_board_snapshot_is_empty() {
        let board = MetricsBoard::new();
        assert_eq!(board.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn writes_are_visible_in_snapshot() {
        let board = MetricsBoard::new();
        board.set_route_completion(42.5);
        board.set_collisions(2);
        board.set_in_route(true);

        let snapshot = board.snapshot();
        assert_eq!(snapshot.route_completion, Some(42.5));
        assert_eq!(snapshot.collisions, Some(2));
        assert_eq!(snapshot.in_route, Some(true));
        // Unwritten metrics stay absent, not zero.
        assert_eq!(snapshot.outside_route_lanes, None);
    }

    #[test]
    fn later_writes_overwrite_earlier_ones() {
        let board = MetricsBoard::new();
        board.set_route_completion(10.0);
        board.set_route_completion(55.0);
        assert_eq!(board.snapshot().route_completion, Some(55.0));
    }

    #[test]
    fn reset_clears_every_metric() {
        let board = MetricsBoard::new();
        board.set_route_completion(88.0);
        board.set_in_route(false);
        board.reset();
        assert_eq!(board.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn snapshot_is_detached_from_the_board() {
        let board = MetricsBoard::new();
        board.set_collisions(0);
        let snapshot = board.snapshot();
        board.set_collisions(3);
        assert_eq!(snapshot.collisions, Some(0));
        assert_eq!(board.snapshot().collisions, Some(3));
    }
}
