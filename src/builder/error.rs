//! Build errors for state machine and transition builders.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("No transitions defined. Add at least one transition")]
    NoTransitions,

    #[error("Transition trigger not specified. Call .trigger(name)")]
    MissingTrigger,

    #[error("Transition source state not specified. Call .from(state)")]
    MissingFromState,

    #[error("Transition target state not specified. Call .to(state)")]
    MissingToState,

    #[error("Trigger '{trigger}' is declared twice from state '{from}'")]
    DuplicateTrigger { trigger: String, from: String },

    #[error("Final state '{state}' cannot have outgoing transitions")]
    FinalStateHasTransitions { state: String },
}
