//! Error types for scheduler operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by scheduler operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The scheduler has been shut down and accepts no further work.
    #[error("scheduler terminated")]
    Terminated,
    /// `start()` was called on a scheduler that is already running.
    #[error("scheduler already started")]
    AlreadyStarted,
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Status handed to an event's abort handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// The event outlived its deadline.
    Timeout,
    /// The scheduler was torn down while the event was in flight.
    Aborted,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
