//! The engine that fires transitions and runs their actions.

use crate::core::{run_all, ActionFailure, FailureKind, State, StateHistory, StateTransition, TransitionEvent};
use crate::engine::recovery::{Recovery, Verdict};
use crate::engine::transition::TransitionTable;
use crate::enforcement::{TransitionContext, ViolationError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Why a trigger could not fire.
#[derive(Clone, Debug, PartialEq)]
pub enum Ineligible {
    NoTransition,
    GuardNotSatisfied { guard: String },
}

/// Result of a single [`Engine::fire`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum FireOutcome<S: State> {
    /// The state changed to `to` and its on-enter actions ran.
    Committed { from: S, to: S },

    /// Nothing happened; the loop should try the next trigger.
    NotEligible(Ineligible),

    /// A before-action failed recoverably. The context was re-armed and
    /// `source` re-entered.
    RolledBack { source: S, attempt: usize },
}

impl<S: State> FireOutcome<S> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Failures that escape the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("trigger '{trigger}' failed in state '{state}': {failure}")]
    ActionFailed {
        trigger: String,
        state: String,
        #[source]
        failure: ActionFailure,
    },

    #[error("on-enter action of state '{state}' failed: {failure}")]
    OnEnterFailed {
        state: String,
        #[source]
        failure: ActionFailure,
    },

    #[error("trigger '{trigger}' gave up after {attempts} attempts: {}", join_violations(.violations))]
    RetriesExhausted {
        trigger: String,
        attempts: usize,
        violations: Vec<ViolationError>,
        failure: ActionFailure,
    },

    #[error("state '{0}' is not declared in the transition table")]
    UnknownState(String),
}

impl EngineError {
    /// Kind of the underlying action failure, if any.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::ActionFailed { failure, .. }
            | Self::OnEnterFailed { failure, .. }
            | Self::RetriesExhausted { failure, .. } => Some(failure.kind()),
            Self::UnknownState(_) => None,
        }
    }
}

fn join_violations(violations: &[ViolationError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Holds the current state and drives a [`TransitionTable`].
///
/// The engine owns no agent data: the context is borrowed for every call,
/// which keeps behaviour (engine) and data (context) apart.
pub struct Engine<S: State, C> {
    initial: S,
    current: S,
    table: TransitionTable<S, C>,
    recovery: Recovery<S, C>,
    history: StateHistory<S>,
    attempts: HashMap<String, usize>,
    retry_started: Option<DateTime<Utc>>,
    action_deadline: Option<Duration>,
}

impl<S: State, C> Engine<S, C> {
    pub fn new(initial: S, table: TransitionTable<S, C>, recovery: Recovery<S, C>) -> Self {
        Self {
            current: initial.clone(),
            initial,
            table,
            recovery,
            history: StateHistory::new(),
            attempts: HashMap::new(),
            retry_started: None,
            action_deadline: None,
        }
    }

    /// Fail actions that return after running longer than `deadline`.
    pub fn with_action_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.action_deadline = deadline;
        self
    }

    pub fn current_state(&self) -> &S {
        &self.current
    }

    pub fn initial_state(&self) -> &S {
        &self.initial
    }

    pub fn is_final(&self) -> bool {
        self.table.is_terminal(&self.current)
    }

    pub fn history(&self) -> &StateHistory<S> {
        &self.history
    }

    pub fn table(&self) -> &TransitionTable<S, C> {
        &self.table
    }

    /// Pending retry count for `trigger`.
    pub fn attempts(&self, trigger: &str) -> usize {
        self.attempts.get(trigger).copied().unwrap_or(0)
    }

    /// Triggers leaving `state`, in declaration order.
    pub fn valid_triggers(&self, state: &S) -> Vec<&str> {
        self.table.valid_triggers(state)
    }

    /// Attempt `trigger` from the current state.
    pub fn fire(&mut self, trigger: &str, context: &mut C) -> Result<FireOutcome<S>, EngineError> {
        let source = self.current.clone();
        let Some(transition) = self.table.transition_for(&source, trigger) else {
            debug!(trigger, state = source.name(), "no transition for trigger");
            return Ok(FireOutcome::NotEligible(Ineligible::NoTransition));
        };

        if let Some(guard) = &transition.guard {
            let passed = guard.check(context);
            debug!(trigger, guard = guard.name(), passed, "evaluated guard");
            if !passed {
                return Ok(FireOutcome::NotEligible(Ineligible::GuardNotSatisfied {
                    guard: guard.name().to_string(),
                }));
            }
        }

        let dest = transition.to.clone();
        let event = TransitionEvent::new(trigger, source.clone(), dest.clone());
        info!(trigger, from = source.name(), to = dest.name(), "firing transition");

        if let Err(failure) = run_all(&transition.before, context, &event, self.action_deadline) {
            return self.recover(event, failure, context);
        }

        let attempt = self.attempts.remove(trigger).unwrap_or(0) + 1;
        self.retry_started = None;
        self.commit(trigger, dest.clone(), attempt, false);
        info!(trigger, from = source.name(), to = dest.name(), attempt, "committed transition");

        self.enter(context, &event)?;
        Ok(FireOutcome::Committed {
            from: source,
            to: dest,
        })
    }

    /// Make `state` current and run its on-enter actions.
    ///
    /// Used by recovery to return to the source of a failed transition,
    /// and by supervisors resuming a persisted agent. It is independent of
    /// the declared triggers.
    pub fn reenter(&mut self, state: S, context: &mut C) -> Result<(), EngineError> {
        let event = TransitionEvent::reentry("reenter", self.current.clone(), state);
        self.reenter_with(event, context)
    }

    /// Place the engine in `state` without running any action.
    pub fn restore(&mut self, state: S) -> Result<(), EngineError> {
        if !self.table.contains_state(&state) {
            return Err(EngineError::UnknownState(state.name().to_string()));
        }
        info!(state = state.name(), "restored engine state");
        self.current = state;
        self.attempts.clear();
        self.retry_started = None;
        Ok(())
    }

    fn reenter_with(&mut self, event: TransitionEvent<S>, context: &mut C) -> Result<(), EngineError> {
        if !self.table.contains_state(&event.dest) {
            return Err(EngineError::UnknownState(event.dest.name().to_string()));
        }
        let attempt = self.attempts(&event.trigger);
        self.commit(&event.trigger, event.dest.clone(), attempt, true);
        info!(
            trigger = %event.trigger,
            state = event.dest.name(),
            "re-entered state"
        );
        self.enter(context, &event)
    }

    fn recover(
        &mut self,
        event: TransitionEvent<S>,
        failure: ActionFailure,
        context: &mut C,
    ) -> Result<FireOutcome<S>, EngineError> {
        let trigger = event.trigger.clone();
        let source = event.source.clone();

        let attempt = {
            let count = self.attempts.entry(trigger.clone()).or_insert(0);
            *count += 1;
            *count
        };
        let started_at = *self.retry_started.get_or_insert_with(Utc::now);
        let streak = TransitionContext {
            trigger: trigger.clone(),
            from: source.clone(),
            to: event.dest.clone(),
            attempt,
            started_at,
        };

        match self.recovery.decide(&failure, &streak) {
            Verdict::Rollback => {
                warn!(
                    %trigger,
                    source = source.name(),
                    attempt,
                    action = %failure.action,
                    "recoverable failure, rolling back to source"
                );
                self.recovery.rearm_context(context);
                let reentry = TransitionEvent::reentry(trigger, source.clone(), source.clone())
                    .with_error(failure);
                self.reenter_with(reentry, context)?;
                Ok(FireOutcome::RolledBack { source, attempt })
            }
            Verdict::Propagate => {
                self.attempts.remove(&trigger);
                error!(
                    %trigger,
                    state = source.name(),
                    action = %failure.action,
                    error = %failure.error,
                    "unrecoverable action failure"
                );
                Err(EngineError::ActionFailed {
                    trigger,
                    state: source.name().to_string(),
                    failure,
                })
            }
            Verdict::Exhausted(violations) => {
                error!(
                    %trigger,
                    state = source.name(),
                    attempt,
                    violations = violations.len(),
                    "retries exhausted"
                );
                Err(EngineError::RetriesExhausted {
                    trigger,
                    attempts: attempt,
                    violations,
                    failure,
                })
            }
        }
    }

    fn commit(&mut self, trigger: &str, to: S, attempt: usize, reentry: bool) {
        let record = StateTransition {
            trigger: trigger.to_string(),
            from: self.current.clone(),
            to: to.clone(),
            timestamp: Utc::now(),
            attempt,
            reentry,
        };
        self.history = self.history.record(record);
        self.current = to;
    }

    /// On-enter failures never undo the committed state.
    fn enter(&self, context: &mut C, event: &TransitionEvent<S>) -> Result<(), EngineError> {
        let actions = self.table.on_enter(&event.dest);
        run_all(actions, context, event, self.action_deadline).map_err(|failure| {
            error!(
                state = event.dest.name(),
                action = %failure.action,
                error = %failure.error,
                "on-enter action failed, state stays committed"
            );
            EngineError::OnEnterFailed {
                state: event.dest.name().to_string(),
                failure,
            }
        })
    }
}
