//! Core state machine types.
//!
//! - `State` for machine states
//! - `Guard` predicates over the agent context
//! - `Action` and the failure taxonomy actions report
//! - `TransitionEvent` passed to every action
//! - Immutable `StateHistory`

mod action;
mod event;
mod guard;
mod history;
mod state;

pub use action::{Action, ActionError, ActionFailure, ActionFn, FailureKind};
pub(crate) use action::run_all;
pub use event::TransitionEvent;
pub use guard::Guard;
pub use history::{StateHistory, StateTransition};
pub use state::State;
