//! Builder API for retry enforcement rules.

use crate::core::State;
use crate::enforcement::context::TransitionContext;
use crate::enforcement::rules::{EnforcementRules, ValidationCheck};
use crate::enforcement::violations::{ViolationError, ViolationStrategy};
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub struct EnforcementBuilder<S: State> {
    max_attempts: Option<usize>,
    retry_window: Option<Duration>,
    required_checks: Vec<ValidationCheck<S>>,
    on_violation: ViolationStrategy,
}

impl<S: State> EnforcementBuilder<S> {
    pub fn new() -> Self {
        Self {
            max_attempts: None,
            retry_window: None,
            required_checks: Vec::new(),
            on_violation: ViolationStrategy::Abort,
        }
    }

    /// Maximum failures of one trigger that may still be retried.
    pub fn max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = Some(n);
        self
    }

    /// Longest time a retry streak may run, measured from its first failure.
    pub fn retry_window(mut self, window: Duration) -> Self {
        self.retry_window = Some(window);
        self
    }

    pub fn require<F>(mut self, check: F) -> Self
    where
        F: Fn(&TransitionContext<S>) -> Validation<(), NonEmptyVec<ViolationError>>
            + Send
            + Sync
            + 'static,
    {
        self.required_checks.push(Box::new(check));
        self
    }

    /// Add a predicate check reported with `message` when it fails.
    pub fn require_pred<F>(mut self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&TransitionContext<S>) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        let check = move |ctx: &TransitionContext<S>| {
            if predicate(ctx) {
                Validation::success(())
            } else {
                Validation::fail(ViolationError::CustomCheckFailed {
                    message: message.clone(),
                })
            }
        };
        self.required_checks.push(Box::new(check));
        self
    }

    pub fn on_violation(mut self, strategy: ViolationStrategy) -> Self {
        self.on_violation = strategy;
        self
    }

    pub fn build(self) -> EnforcementRules<S> {
        EnforcementRules {
            max_attempts: self.max_attempts,
            retry_window: self.retry_window,
            required_checks: self.required_checks,
            on_violation: self.on_violation,
        }
    }
}

impl<S: State> Default for EnforcementBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
