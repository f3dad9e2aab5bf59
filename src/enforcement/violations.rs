//! Violation errors and handling strategies.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Reasons a rollback-retry is refused.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ViolationError {
    #[error("Maximum attempts ({max}) exceeded (current: {current})")]
    MaxAttemptsExceeded { max: usize, current: usize },

    #[error("Retry window ({window:?}) exceeded (elapsed: {elapsed:?})")]
    RetryWindowExceeded { window: Duration, elapsed: Duration },

    #[error("Custom check failed: {message}")]
    CustomCheckFailed { message: String },
}

/// What recovery does once a rule is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationStrategy {
    /// Stop retrying and surface the failure.
    #[default]
    Abort,

    /// Log the violation and roll back anyway.
    IgnoreAndLog,
}
