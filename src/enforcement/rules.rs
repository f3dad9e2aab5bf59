//! Retry enforcement rules evaluated with `Validation`.

use crate::core::State;
use crate::enforcement::context::TransitionContext;
use crate::enforcement::violations::{ViolationError, ViolationStrategy};
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub type ValidationCheck<S> =
    Box<dyn Fn(&TransitionContext<S>) -> Validation<(), NonEmptyVec<ViolationError>> + Send + Sync>;

/// Limits on how long a failing trigger keeps being retried.
pub struct EnforcementRules<S: State> {
    pub(crate) max_attempts: Option<usize>,
    pub(crate) retry_window: Option<Duration>,
    pub(crate) required_checks: Vec<ValidationCheck<S>>,
    pub(crate) on_violation: ViolationStrategy,
}

impl<S: State> EnforcementRules<S> {
    /// Evaluate every rule, accumulating all violations.
    pub fn enforce(
        &self,
        context: &TransitionContext<S>,
    ) -> Validation<(), NonEmptyVec<ViolationError>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<ViolationError>>> = Vec::new();

        if let Some(max) = self.max_attempts {
            let check = if context.attempt > max {
                Validation::fail(ViolationError::MaxAttemptsExceeded {
                    max,
                    current: context.attempt,
                })
            } else {
                Validation::success(())
            };
            checks.push(check);
        }

        if let Some(window) = self.retry_window {
            let elapsed = context.elapsed();
            let check = if elapsed > window {
                Validation::fail(ViolationError::RetryWindowExceeded { window, elapsed })
            } else {
                Validation::success(())
            };
            checks.push(check);
        }

        for check_fn in &self.required_checks {
            checks.push(check_fn(context));
        }

        Validation::all_vec(checks).map(|_| ())
    }

    /// Flattened form of [`enforce`](Self::enforce); empty when every rule passes.
    pub fn violations(&self, context: &TransitionContext<S>) -> Vec<ViolationError> {
        match self.enforce(context) {
            Validation::Success(_) => Vec::new(),
            Validation::Failure(errors) => errors.iter().cloned().collect(),
        }
    }

    pub fn violation_strategy(&self) -> ViolationStrategy {
        self.on_violation
    }

    pub fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }
}
