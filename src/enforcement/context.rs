//! Retry attempt data handed to enforcement checks.

use crate::core::State;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// The failed trigger being considered for another rollback-retry.
#[derive(Clone, Debug)]
pub struct TransitionContext<S: State> {
    pub trigger: String,
    pub from: S,
    pub to: S,
    /// Failures of this trigger so far, including the current one.
    pub attempt: usize,
    /// When the first failure in the current retry streak happened.
    pub started_at: DateTime<Utc>,
}

impl<S: State> TransitionContext<S> {
    pub fn elapsed(&self) -> Duration {
        let now = Utc::now();
        now.signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}
