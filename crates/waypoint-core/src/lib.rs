//! Tick orchestration core for the Waypoint scenario harness.
//!
//! This crate owns the synchronization loop that drives one scripted
//! driving scenario against an external, clock-driven simulation server:
//! watchdog-based stall detection, the strictly-ordered per-tick cycle
//! (clock update, agent step, tree evaluation, control application,
//! synchronized clock advance), and the post-run scoring report.
//!
//! # Modules
//!
//! - [`agent`] -- [`DrivingAgent`] seam, [`AgentAdapter`], and [`StubAgent`].
//! - [`behavior`] -- [`ScenarioTree`] seam and the scripted test tree.
//! - [`clock`] -- [`ClockSource`] seam, the scenario clock, and scripted
//!   clock sources.
//! - [`config`] -- Configuration loading from `waypoint-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- [`StopToken`] cooperative cancellation flag.
//! - [`manager`] -- [`ScenarioManager`], the tick orchestrator.
//! - [`metrics`] -- [`MetricsBoard`], the typed scenario metrics
//!   accumulator.
//! - [`provider`] -- [`DataProvider`] seam for actor registration and
//!   per-tick world state.
//! - [`report`] -- Verdict derivation and the human-readable score
//!   summary.
//! - [`watchdog`] -- Background liveness timer.
//!
//! [`DrivingAgent`]: agent::DrivingAgent
//! [`AgentAdapter`]: agent::AgentAdapter
//! [`StubAgent`]: agent::StubAgent
//! [`ScenarioTree`]: behavior::ScenarioTree
//! [`ClockSource`]: clock::ClockSource
//! [`StopToken`]: control::StopToken
//! [`ScenarioManager`]: manager::ScenarioManager
//! [`MetricsBoard`]: metrics::MetricsBoard
//! [`DataProvider`]: provider::DataProvider

pub mod agent;
pub mod behavior;
pub mod clock;
pub mod config;
pub mod control;
pub mod manager;
pub mod metrics;
pub mod provider;
pub mod report;
pub mod watchdog;
