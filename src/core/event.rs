//! Per-attempt event data handed to actions.

use super::action::ActionFailure;
use super::state::State;

/// Describes one trigger attempt or re-entry.
///
/// Created fresh for every attempt and dropped afterwards. Error handling
/// receives a copy with `error` filled in.
#[derive(Clone, Debug)]
pub struct TransitionEvent<S: State> {
    pub trigger: String,
    pub source: S,
    pub dest: S,
    pub reentry: bool,
    pub error: Option<ActionFailure>,
}

impl<S: State> TransitionEvent<S> {
    pub fn new(trigger: impl Into<String>, source: S, dest: S) -> Self {
        Self {
            trigger: trigger.into(),
            source,
            dest,
            reentry: false,
            error: None,
        }
    }

    /// Event for re-entering `dest` after `trigger` failed.
    pub fn reentry(trigger: impl Into<String>, source: S, dest: S) -> Self {
        Self {
            reentry: true,
            ..Self::new(trigger, source, dest)
        }
    }

    pub fn with_error(mut self, failure: ActionFailure) -> Self {
        self.error = Some(failure);
        self
    }
}
