//! Error types for the harness binary.
//!
//! [`HarnessError`] is the top-level error type that wraps all possible
//! failure modes during harness startup and scenario execution.

/// Top-level error for the harness binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: waypoint_core::config::ConfigError,
    },

    /// Scenario orchestration failed.
    #[error("scenario error: {source}")]
    Scenario {
        /// The underlying scenario error.
        #[from]
        source: waypoint_core::manager::ScenarioError,
    },

    /// The blocking scenario task could not be joined.
    #[error("scenario task failed: {message}")]
    Join {
        /// Description of the join failure.
        message: String,
    },
}
