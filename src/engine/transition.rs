//! Transition descriptors and the table they are resolved into.

use crate::core::{Action, Guard, State};
use std::collections::HashMap;

/// A table-declared transition.
pub struct Transition<S: State, C> {
    pub trigger: String,
    pub from: S,
    pub to: S,
    pub guard: Option<Guard<C>>,
    /// Run in order before the state change is committed.
    pub before: Vec<Action<S, C>>,
}

impl<S: State, C> Transition<S, C> {
    /// Guard check only; the source state is matched by the table.
    pub fn guard_allows(&self, context: &C) -> bool {
        self.guard.as_ref().map_or(true, |g| g.check(context))
    }
}

impl<S: State, C> Clone for Transition<S, C> {
    fn clone(&self) -> Self {
        Self {
            trigger: self.trigger.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            guard: self.guard.clone(),
            before: self.before.clone(),
        }
    }
}

/// Immutable lookup structure built once per machine.
///
/// Transitions are indexed by source state name, preserving declaration
/// order, so `valid_triggers` needs no introspection at run time.
pub struct TransitionTable<S: State, C> {
    transitions: Vec<Transition<S, C>>,
    by_source: HashMap<String, Vec<usize>>,
    on_enter: HashMap<String, Vec<Action<S, C>>>,
    states: Vec<S>,
}

impl<S: State, C> TransitionTable<S, C> {
    pub(crate) fn new(
        transitions: Vec<Transition<S, C>>,
        on_enter: Vec<(S, Vec<Action<S, C>>)>,
    ) -> Self {
        let mut by_source: HashMap<String, Vec<usize>> = HashMap::new();
        let mut states: Vec<S> = Vec::new();
        let mut remember = |state: &S| {
            if !states.contains(state) {
                states.push(state.clone());
            }
        };

        for (index, transition) in transitions.iter().enumerate() {
            by_source
                .entry(transition.from.name().to_string())
                .or_default()
                .push(index);
            remember(&transition.from);
            remember(&transition.to);
        }

        let mut hooks: HashMap<String, Vec<Action<S, C>>> = HashMap::new();
        for (state, actions) in on_enter {
            remember(&state);
            hooks
                .entry(state.name().to_string())
                .or_default()
                .extend(actions);
        }

        Self {
            transitions,
            by_source,
            on_enter: hooks,
            states,
        }
    }

    /// Triggers leaving `state`, in declaration order.
    pub fn valid_triggers(&self, state: &S) -> Vec<&str> {
        self.outgoing(state)
            .map(|t| t.trigger.as_str())
            .collect()
    }

    pub fn transition_for(&self, state: &S, trigger: &str) -> Option<&Transition<S, C>> {
        self.outgoing(state).find(|t| t.trigger == trigger)
    }

    pub fn on_enter(&self, state: &S) -> &[Action<S, C>] {
        self.on_enter
            .get(state.name())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Final, or without any outgoing transition.
    pub fn is_terminal(&self, state: &S) -> bool {
        state.is_final() || !self.by_source.contains_key(state.name())
    }

    pub fn contains_state(&self, state: &S) -> bool {
        self.states.contains(state)
    }

    pub fn states(&self) -> &[S] {
        &self.states
    }

    pub fn transitions(&self) -> &[Transition<S, C>] {
        &self.transitions
    }

    fn outgoing<'a>(&'a self, state: &S) -> impl Iterator<Item = &'a Transition<S, C>> + 'a {
        self.by_source
            .get(state.name())
            .into_iter()
            .flatten()
            .map(move |&index| &self.transitions[index])
    }
}
