//! Discovery Error Hierarchy
//!
//! Defines the error types surfaced by the interest registry and its
//! collaborators, categorized by configuration, discovery runtime and
//! unrecoverable failures.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Watch lifecycle and notification failures
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Scope watch could not be started (coordination store unreachable, ...)
    #[error("Failed to start watch for {object_class} under scope {scope}: {reason}")]
    WatchStartFailed {
        scope: String,
        object_class: String,
        reason: String,
    },

    /// Coordination store refused the operation
    #[error("Coordination store unavailable: {0}")]
    CoordinationUnavailable(String),

    /// `start()` called on a watch that is already running
    #[error("Watch on {path} already started")]
    WatchAlreadyStarted { path: String },

    /// Failure reported by a subscriber callback
    #[error("Endpoint listener failed: {0}")]
    Listener(String),
}

impl DiscoveryError {
    /// Wraps a start failure with the scope it was attempted for.
    pub fn watch_start_failed(
        scope: impl Into<String>,
        object_class: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        DiscoveryError::WatchStartFailed {
            scope: scope.into(),
            object_class: object_class.into(),
            reason: reason.to_string(),
        }
    }
}
