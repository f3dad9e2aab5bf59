//! Failure classification and rollback-retry policy.

use crate::core::{ActionFailure, FailureKind, State};
use crate::enforcement::{EnforcementRules, TransitionContext, ViolationError, ViolationStrategy};
use std::fmt;
use std::sync::Arc;

/// Resets the decision flags a failed attempt relied on.
pub type RearmFn<C> = Arc<dyn Fn(&mut C) + Send + Sync>;

/// What recovery decided for a failed before-action.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Re-arm the context and re-enter the source state.
    Rollback,
    /// Surface the failure to the caller.
    Propagate,
    /// Recoverable, but the retry rules refused another attempt.
    Exhausted(Vec<ViolationError>),
}

/// Decides between rollback-retry and propagation.
///
/// Only [`FailureKind::BusinessActionFailure`] is retried. Retries are
/// bounded by the configured [`EnforcementRules`]; without rules every
/// business failure rolls back.
pub struct Recovery<S: State, C> {
    rearm: Option<RearmFn<C>>,
    rules: Option<EnforcementRules<S>>,
}

impl<S: State, C> Recovery<S, C> {
    pub fn new() -> Self {
        Self {
            rearm: None,
            rules: None,
        }
    }

    pub fn rearm<F>(mut self, rearm: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.rearm = Some(Arc::new(rearm));
        self
    }

    pub fn rules(mut self, rules: EnforcementRules<S>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn classify(&self, failure: &ActionFailure) -> FailureKind {
        failure.kind()
    }

    /// Decide what to do with `failure`, given the retry streak in `attempt`.
    pub fn decide(&self, failure: &ActionFailure, attempt: &TransitionContext<S>) -> Verdict {
        if !self.classify(failure).is_recoverable() {
            return Verdict::Propagate;
        }

        let Some(rules) = &self.rules else {
            return Verdict::Rollback;
        };

        let violations = rules.violations(attempt);
        if violations.is_empty() {
            return Verdict::Rollback;
        }

        match rules.violation_strategy() {
            ViolationStrategy::Abort => Verdict::Exhausted(violations),
            ViolationStrategy::IgnoreAndLog => {
                for violation in &violations {
                    tracing::warn!(
                        trigger = %attempt.trigger,
                        attempt = attempt.attempt,
                        %violation,
                        "retry rule violated, rolling back anyway"
                    );
                }
                Verdict::Rollback
            }
        }
    }

    /// Clear the guard flags on `context`.
    pub fn rearm_context(&self, context: &mut C) {
        if let Some(rearm) = &self.rearm {
            rearm(context);
        }
    }
}

impl<S: State, C> Default for Recovery<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State, C> fmt::Debug for Recovery<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovery")
            .field("rearm", &self.rearm.is_some())
            .field("max_attempts", &self.rules.as_ref().and_then(|r| r.max_attempts()))
            .finish()
    }
}
