//! Builder for constructing engines.

use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::core::{Action, ActionError, State, TransitionEvent};
use crate::engine::{Engine, Recovery, Transition, TransitionTable};
use std::time::Duration;

/// Declares states, transitions and recovery, then validates them into an
/// [`Engine`].
pub struct StateMachineBuilder<S: State + 'static, C: 'static> {
    initial: Option<S>,
    transitions: Vec<Transition<S, C>>,
    on_enter: Vec<(S, Vec<Action<S, C>>)>,
    recovery: Recovery<S, C>,
    action_deadline: Option<Duration>,
}

impl<S: State + 'static, C: 'static> StateMachineBuilder<S, C> {
    pub fn new() -> Self {
        Self {
            initial: None,
            transitions: Vec::new(),
            on_enter: Vec::new(),
            recovery: Recovery::new(),
            action_deadline: None,
        }
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Declare `state` with its on-enter actions, run in the given order.
    pub fn state(mut self, state: S, on_enter: Vec<Action<S, C>>) -> Self {
        self.on_enter.push((state, on_enter));
        self
    }

    /// Append one on-enter action to `state`.
    pub fn on_enter<F>(self, state: S, name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&mut C, &TransitionEvent<S>) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.state(state, vec![Action::new(name, run)])
    }

    /// Add a transition using a builder.
    pub fn transition(mut self, builder: TransitionBuilder<S, C>) -> Result<Self, BuildError> {
        let transition = builder.build()?;
        self.transitions.push(transition);
        Ok(self)
    }

    /// Add a pre-built transition.
    pub fn add_transition(mut self, transition: Transition<S, C>) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn transitions(mut self, transitions: Vec<Transition<S, C>>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    pub fn recovery(mut self, recovery: Recovery<S, C>) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn action_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.action_deadline = deadline;
        self
    }

    /// Validate the declaration and build the engine.
    pub fn build(self) -> Result<Engine<S, C>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;

        if self.transitions.is_empty() {
            return Err(BuildError::NoTransitions);
        }

        for (index, transition) in self.transitions.iter().enumerate() {
            if transition.from.is_final() {
                return Err(BuildError::FinalStateHasTransitions {
                    state: transition.from.name().to_string(),
                });
            }
            let duplicate = self.transitions[..index]
                .iter()
                .any(|earlier| earlier.from == transition.from && earlier.trigger == transition.trigger);
            if duplicate {
                return Err(BuildError::DuplicateTrigger {
                    trigger: transition.trigger.clone(),
                    from: transition.from.name().to_string(),
                });
            }
        }

        let table = TransitionTable::new(self.transitions, self.on_enter);
        Ok(Engine::new(initial, table, self.recovery).with_action_deadline(self.action_deadline))
    }
}

impl<S: State + 'static, C: 'static> Default for StateMachineBuilder<S, C> {
    fn default() -> Self {
        Self::new()
    }
}
