//! Verdict derivation and the human-readable score summary.
//!
//! The reporter turns the final tree status plus a metrics snapshot into
//! formatted console text -- its only externally visible side effect.
//! Executors embedding the harness that need machine-readable results
//! should serialize [`ScenarioResult`] instead of parsing this text.
//!
//! Two guard rails: a loop that exited while the tree was still running
//! yields an inconclusive notice and no score, and a snapshot missing
//! any required metric yields nothing at all -- a partial score is worse
//! than none.
//!
//! One asymmetry is deliberate and must stay: a terminal success status
//! with less than full route completion is reported with the timed-out
//! failure headline, even though the underlying tree status is success.
//!
//! [`ScenarioResult`]: crate::manager::ScenarioResult

use waypoint_types::{MetricsSnapshot, TreeStatus};

const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

/// Route completion at or above this percentage counts as full.
const COMPLETION_CLAMP_THRESHOLD: f64 = 99.0;

/// Verdict derived from the final tree status and the metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Verdict {
    /// Terminal success with full route completion.
    Finished,
    /// Terminal success without full route completion -- reported as a
    /// time-based failure on purpose.
    TimedOut,
    /// Terminal failure with the actor off the route.
    DeviatedFromRoute,
    /// Terminal failure with the actor still on the route.
    NotFinishedInTime,
}

impl Verdict {
    /// The headline printed above the score block.
    pub const fn headline(self) -> &'static str {
        match self {
            Self::Finished => "> SUCCESS: Congratulations, route finished!",
            Self::TimedOut => "> FAILED: The actor timed out",
            Self::DeviatedFromRoute => "> FAILED: The actor deviated from the route",
            Self::NotFinishedInTime => "> FAILED: The actor didn't finish the route",
        }
    }

    /// Whether this verdict counts as a passing run.
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// A complete, renderable score summary.
///
/// A pure value: rendering it any number of times yields identical
/// output, and building it never mutates the snapshot it came from.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScoreReport {
    /// The derived verdict.
    pub verdict: Verdict,
    /// Route completion percentage, clamped to 100 at or above 99.
    pub route_completion: f64,
    /// Number of collisions.
    pub collisions: u64,
    /// Percentage driven outside the route lanes.
    pub outside_route_lanes: f64,
    /// Number of stop signs run.
    pub stop_sign_violations: u64,
    /// Number of red lights run.
    pub red_light_violations: u64,
}

impl ScoreReport {
    /// Render the verdict headline and the score block.
    ///
    /// With `color` set, pass/fail symbols use ANSI green/red.
    pub fn render(&self, color: bool) -> String {
        let route = symbol(self.route_completion >= 100.0, color);
        let outside = symbol(self.outside_route_lanes <= 0.0, color);
        let collision = symbol(self.collisions == 0, color);
        let red_light = symbol(self.red_light_violations == 0, color);
        let stop = symbol(self.stop_sign_violations == 0, color);

        let mut out = String::new();
        out.push_str(self.verdict.headline());
        out.push_str("\n> \n> Score:\n");
        out.push_str(&format!(
            "> - Route completed [{route}]:      {}%\n",
            self.route_completion
        ));
        out.push_str(&format!(
            "> - Outside route lanes [{outside}]:  {}%\n",
            self.outside_route_lanes
        ));
        out.push_str(&format!(
            "> - Collisions [{collision}]:           {} times\n",
            self.collisions
        ));
        out.push_str(&format!(
            "> - Red lights run [{red_light}]:       {} times\n",
            self.red_light_violations
        ));
        out.push_str(&format!(
            "> - Stop signs run [{stop}]:         {} times\n",
            self.stop_sign_violations
        ));
        out
    }
}

/// What the reporter has to say about a finished run.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// The loop exited while the tree was still running (external
    /// shutdown); a notice is printed, no score.
    Inconclusive,
    /// At least one required metric was never written; nothing is
    /// printed rather than a partial score.
    Unavailable,
    /// All metrics present; a full score summary.
    Scored(ScoreReport),
}

impl ReportOutcome {
    /// The score report, if one was produced.
    pub const fn score(&self) -> Option<&ScoreReport> {
        match self {
            Self::Scored(report) => Some(report),
            Self::Inconclusive | Self::Unavailable => None,
        }
    }

    /// Render whatever this outcome prints, if anything.
    pub fn render(&self, color: bool) -> Option<String> {
        match self {
            Self::Inconclusive => Some(String::from(
                "> Something happened during the simulation. Was it manually shut down?\n",
            )),
            Self::Unavailable => None,
            Self::Scored(report) => Some(report.render(color)),
        }
    }
}

/// Derive the report for a finished run.
///
/// Pure: the same status and snapshot always produce the same outcome,
/// and the snapshot is never mutated.
pub fn build_report(status: TreeStatus, metrics: &MetricsSnapshot) -> ReportOutcome {
    if !status.is_terminal() {
        return ReportOutcome::Inconclusive;
    }

    let (
        Some(route_completion),
        Some(collisions),
        Some(outside_route_lanes),
        Some(stop_sign_violations),
        Some(red_light_violations),
        Some(in_route),
    ) = (
        metrics.route_completion,
        metrics.collisions,
        metrics.outside_route_lanes,
        metrics.stop_sign_violations,
        metrics.red_light_violations,
        metrics.in_route,
    )
    else {
        return ReportOutcome::Unavailable;
    };

    // Near-complete routes count as complete.
    let route_completion = if route_completion >= COMPLETION_CLAMP_THRESHOLD {
        100.0
    } else {
        route_completion
    };

    let verdict = if status == TreeStatus::Failure {
        if in_route {
            Verdict::NotFinishedInTime
        } else {
            Verdict::DeviatedFromRoute
        }
    } else if route_completion >= 100.0 {
        Verdict::Finished
    } else {
        Verdict::TimedOut
    };

    ReportOutcome::Scored(ScoreReport {
        verdict,
        route_completion,
        collisions,
        outside_route_lanes,
        stop_sign_violations,
        red_light_violations,
    })
}

fn symbol(pass: bool, color: bool) -> String {
    match (pass, color) {
        (true, true) => format!("{GREEN}O{RESET}"),
        (true, false) => String::from("O"),
        (false, true) => format!("{RED}X{RESET}"),
        (false, false) => String::from("X"),
    }
}
