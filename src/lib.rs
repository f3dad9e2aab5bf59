//! Tradefsm: a guarded state machine engine for autonomous trading agents
//!
//! An agent's lifecycle is a finite state machine. Transitions are gated by
//! guards over the agent's context, run before-actions that may fail, and on
//! commit run the destination's on-enter actions. Business failures such as
//! an unfilled order roll the agent back to the source state for another
//! attempt; anything else stops the run.
//!
//! # Core Concepts
//!
//! - **State**: machine states via the `State` trait (or `state_enum!`)
//! - **Guards**: pure predicates over the context
//! - **Actions**: named, side-effecting, returning classified `ActionError`s
//! - **Engine**: fires triggers, commits, re-enters, and recovers
//! - **Driver**: the run loop that takes an agent to a terminal state
//! - **Checkpoint**: snapshots written by the persistence hook
//!
//! # Example
//!
//! ```rust
//! use tradefsm::builder::{StateMachineBuilder, TransitionBuilder};
//! use tradefsm::engine::Driver;
//! use tradefsm::state_enum;
//!
//! state_enum! {
//!     enum Order {
//!         Pending,
//!         Filled,
//!     }
//!     final: [Filled]
//! }
//!
//! #[derive(Default)]
//! struct Quote {
//!     crossed: bool,
//! }
//!
//! let mut engine = StateMachineBuilder::new()
//!     .initial(Order::Pending)
//!     .transition(
//!         TransitionBuilder::new()
//!             .trigger("Fill")
//!             .from(Order::Pending)
//!             .to(Order::Filled)
//!             .when("crossed", |q: &Quote| q.crossed),
//!     )
//!     .and_then(|b| b.build())
//!     .unwrap();
//!
//! let mut quote = Quote { crossed: true };
//! let report = Driver::default().run(&mut engine, &mut quote).unwrap();
//! assert_eq!(report.final_state, Order::Filled);
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod engine;
pub mod enforcement;
pub mod trading;

pub use crate::core::{Action, ActionError, FailureKind, Guard, State, StateHistory, TransitionEvent};
pub use crate::engine::{Agent, Driver, Engine, EngineError, FireOutcome, RunError};
