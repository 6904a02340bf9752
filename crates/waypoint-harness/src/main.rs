//! Harness binary for the Waypoint scenario core.
//!
//! Wires a scripted, in-process simulation -- a stepping clock source, a
//! scripted behavior tree that writes the full metric set, and a stub
//! agent -- to the tick orchestrator and runs one scenario end to end.
//! Useful as a smoke test of the orchestration pipeline and as the
//! reference for embedding the core against a real simulation server.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `waypoint-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the scripted collaborators
//! 4. Create the scenario manager
//! 5. Wire ctrl-c to the stop token
//! 6. Load and run the scenario on a blocking task
//! 7. Print the score report and derive the exit code

mod error;

use std::path::Path;
use std::process::ExitCode;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use waypoint_core::agent::StubAgent;
use waypoint_core::behavior::ScriptedTree;
use waypoint_core::clock::SteppingClockSource;
use waypoint_core::config::HarnessConfig;
use waypoint_core::manager::ScenarioManager;
use waypoint_core::provider::MemoryDataProvider;
use waypoint_core::report::build_report;
use waypoint_types::{TreeStatus, VehicleControl};

use crate::error::HarnessError;

/// Simulation seconds consumed per scripted server step.
const STEP_SECONDS: f64 = 0.05;

/// Ticks the scripted demo scenario runs before succeeding.
const DEMO_TICKS: u32 = 40;

/// Application entry point for the harness.
#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("waypoint-harness error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes all subsystems and runs one scripted scenario.
async fn run() -> Result<ExitCode, HarnessError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!("waypoint-harness starting");
    info!(
        watchdog_timeout_seconds = config.scenario.watchdog_timeout_seconds,
        debug_mode = config.scenario.debug_mode,
        track = ?config.scenario.track,
        "Configuration loaded"
    );

    // 3. Build the scripted collaborators.
    let mut source = SteppingClockSource::new(STEP_SECONDS);
    let mut provider = MemoryDataProvider::new();
    let agent = StubAgent::new(VehicleControl {
        throttle: 0.35,
        ..VehicleControl::default()
    });

    // 4. Create the scenario manager and the scripted scenario. The
    //    metrics board is shared into the tree the way a real executor
    //    shares it into its criteria nodes.
    let mut manager = ScenarioManager::new(config.scenario.clone())?;
    let tree = ScriptedTree::new("demo-route", DEMO_TICKS, TreeStatus::Success)
        .with_board(manager.metrics_board());
    info!(ticks = DEMO_TICKS, step_seconds = STEP_SECONDS, "Scripted scenario assembled");

    // 5. Wire ctrl-c to the stop token.
    let token = manager.stop_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, requesting stop");
            token.request_stop();
        }
    });

    // 6. Load and run the scenario off the async runtime; the loop is
    //    deliberately blocking and single-threaded.
    let result = tokio::task::spawn_blocking(move || {
        manager.load(Box::new(tree), Some(Box::new(agent)), &mut provider)?;
        let result = manager.run(&mut source, &mut provider);
        manager.stop(&mut provider);
        result.map_err(HarnessError::from)
    })
    .await
    .map_err(|err| HarnessError::Join {
        message: err.to_string(),
    })??;

    info!(
        run_id = %result.run_id,
        outcome = ?result.outcome,
        ticks_executed = result.ticks_executed,
        game_seconds = result.durations.game_seconds,
        system_seconds = result.durations.system_seconds,
        "Scenario completed"
    );

    // 7. Print the score report and derive the exit code.
    let report = build_report(result.tree_status, &result.metrics);
    match report.render(true) {
        Some(text) => println!("\n{text}"),
        None => warn!("Required metrics missing, no score available"),
    }

    let passed = report.score().is_some_and(|score| score.verdict.is_pass());
    if passed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Load the harness configuration from `waypoint-config.yaml`.
///
/// Looks for the config file relative to the current working directory
/// and falls back to defaults when it is absent.
fn load_config() -> Result<HarnessConfig, HarnessError> {
    let config_path = Path::new("waypoint-config.yaml");
    if config_path.exists() {
        Ok(HarnessConfig::from_file(config_path)?)
    } else {
        Ok(HarnessConfig::default())
    }
}
