//! Builder for constructing transitions.

use crate::builder::error::BuildError;
use crate::core::{Action, ActionError, Guard, State, TransitionEvent};
use crate::engine::Transition;

/// Builder for constructing transitions with a fluent API.
pub struct TransitionBuilder<S: State, C> {
    trigger: Option<String>,
    from: Option<S>,
    to: Option<S>,
    guard: Option<Guard<C>>,
    before: Vec<Action<S, C>>,
}

impl<S: State + 'static, C: 'static> TransitionBuilder<S, C> {
    pub fn new() -> Self {
        Self {
            trigger: None,
            from: None,
            to: None,
            guard: None,
            before: Vec::new(),
        }
    }

    /// Set the trigger name (required).
    pub fn trigger(mut self, name: impl Into<String>) -> Self {
        self.trigger = Some(name.into());
        self
    }

    /// Set the source state (required).
    pub fn from(mut self, state: S) -> Self {
        self.from = Some(state);
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: S) -> Self {
        self.to = Some(state);
        self
    }

    pub fn guard(mut self, guard: Guard<C>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a named guard from a closure.
    pub fn when<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::named(name, predicate));
        self
    }

    /// Append a before-action. Before-actions run in the order added.
    pub fn before(mut self, action: Action<S, C>) -> Self {
        self.before.push(action);
        self
    }

    /// Append a before-action from a closure.
    pub fn before_fn<F>(self, name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&mut C, &TransitionEvent<S>) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.before(Action::new(name, run))
    }

    pub fn build(self) -> Result<Transition<S, C>, BuildError> {
        let trigger = self.trigger.ok_or(BuildError::MissingTrigger)?;
        let from = self.from.ok_or(BuildError::MissingFromState)?;
        let to = self.to.ok_or(BuildError::MissingToState)?;

        Ok(Transition {
            trigger,
            from,
            to,
            guard: self.guard,
            before: self.before,
        })
    }
}

impl<S: State + 'static, C: 'static> Default for TransitionBuilder<S, C> {
    fn default() -> Self {
        Self::new()
    }
}
