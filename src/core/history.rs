//! Immutable record of the transitions an agent has taken.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One committed state change or re-entry.
///
/// `attempt` counts how many times the trigger had been tried when it
/// finally committed, so a close that succeeded after one rollback is
/// recorded with `attempt: 2`. Re-entries carry the trigger whose failure
/// caused them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    pub trigger: String,
    pub from: S,
    pub to: S,
    pub timestamp: DateTime<Utc>,
    pub attempt: usize,
    /// True when the entry came from a rollback rather than a table trigger.
    pub reentry: bool,
}

/// Ordered history of state transitions.
///
/// `record` returns a new history and leaves the receiver untouched.
///
/// # Example
///
/// ```rust
/// use tradefsm::core::{State, StateHistory, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Order { New, Live, Done }
///
/// impl State for Order {
///     fn name(&self) -> &str {
///         match self {
///             Self::New => "New",
///             Self::Live => "Live",
///             Self::Done => "Done",
///         }
///     }
/// }
///
/// let history = StateHistory::new()
///     .record(StateTransition {
///         trigger: "Submit".to_string(),
///         from: Order::New,
///         to: Order::Live,
///         timestamp: Utc::now(),
///         attempt: 1,
///         reentry: false,
///     })
///     .record(StateTransition {
///         trigger: "Fill".to_string(),
///         from: Order::Live,
///         to: Order::Done,
///         timestamp: Utc::now(),
///         attempt: 1,
///         reentry: false,
///     });
///
/// assert_eq!(history.get_path(), vec![&Order::New, &Order::Live, &Order::Done]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: Vec<StateTransition<S>>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    pub fn record(&self, transition: StateTransition<S>) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// States visited in order: the first source, then every destination.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the first and last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Number of rollback re-entries recorded.
    pub fn reentries(&self) -> usize {
        self.transitions.iter().filter(|t| t.reentry).count()
    }

    pub fn transitions(&self) -> &[StateTransition<S>] {
        &self.transitions
    }
}
