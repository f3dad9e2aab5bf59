//! Named side-effecting actions and their failure taxonomy.

use super::event::TransitionEvent;
use super::state::State;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Failure returned by an action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    /// Business-level failure the agent can recover from by retrying,
    /// such as an order that did not fill.
    #[error("business action failed: {0}")]
    Business(String),

    #[error("{0}")]
    Unclassified(String),

    #[error("overran deadline of {limit:?} (took {elapsed:?})")]
    DeadlineExceeded { limit: Duration, elapsed: Duration },
}

impl ActionError {
    pub fn business(reason: impl Into<String>) -> Self {
        Self::Business(reason.into())
    }

    pub fn unclassified(reason: impl Into<String>) -> Self {
        Self::Unclassified(reason.into())
    }

    pub fn kind(&self) -> FailureKind {
        FailureKind::of(self)
    }
}

/// Tagged failure kinds used by the recovery layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A guard evaluated false. Reported as an ineligible outcome, never as an error.
    GuardNotSatisfied,
    BusinessActionFailure,
    UnclassifiedFailure,
}

impl FailureKind {
    pub fn of(error: &ActionError) -> Self {
        match error {
            ActionError::Business(_) => Self::BusinessActionFailure,
            ActionError::Unclassified(_) | ActionError::DeadlineExceeded { .. } => {
                Self::UnclassifiedFailure
            }
        }
    }

    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::BusinessActionFailure)
    }
}

/// An [`ActionError`] tagged with the action that raised it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("action '{action}' failed: {error}")]
pub struct ActionFailure {
    pub action: String,
    #[source]
    pub error: ActionError,
}

impl ActionFailure {
    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }
}

/// Signature shared by before-actions and on-enter actions.
pub type ActionFn<S, C> =
    Arc<dyn Fn(&mut C, &TransitionEvent<S>) -> Result<(), ActionError> + Send + Sync>;

/// A named action invoked with the agent context and the current event.
pub struct Action<S: State, C> {
    name: String,
    run: ActionFn<S, C>,
}

impl<S: State, C> Action<S, C> {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&mut C, &TransitionEvent<S>) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the action, converting a deadline overrun into a failure.
    pub fn invoke(
        &self,
        context: &mut C,
        event: &TransitionEvent<S>,
        deadline: Option<Duration>,
    ) -> Result<(), ActionFailure> {
        debug!(
            action = %self.name,
            trigger = %event.trigger,
            source = event.source.name(),
            dest = event.dest.name(),
            "running action"
        );
        let started = Instant::now();
        let mut result = (self.run)(context, event);
        let elapsed = started.elapsed();

        if let (Ok(()), Some(limit)) = (&result, deadline) {
            if elapsed > limit {
                result = Err(ActionError::DeadlineExceeded { limit, elapsed });
            }
        }

        result.map_err(|error| {
            warn!(action = %self.name, kind = ?error.kind(), %error, "action failed");
            ActionFailure {
                action: self.name.clone(),
                error,
            }
        })
    }
}

impl<S: State, C> Clone for Action<S, C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            run: Arc::clone(&self.run),
        }
    }
}

impl<S: State, C> fmt::Debug for Action<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

/// Run `actions` in order, stopping at the first failure.
pub(crate) fn run_all<S: State, C>(
    actions: &[Action<S, C>],
    context: &mut C,
    event: &TransitionEvent<S>,
    deadline: Option<Duration>,
) -> Result<(), ActionFailure> {
    actions
        .iter()
        .try_for_each(|action| action.invoke(context, event, deadline))
}
