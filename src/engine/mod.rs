//! Synchronous execution engine.
//!
//! - **Transition table**: triggers indexed by source state, plus on-enter hooks
//! - **Engine**: guard checks, before-actions, commit, on-enter actions, `reenter`
//! - **Recovery**: rollback-retry for business failures, bounded by enforcement rules
//! - **Driver**: the run loop, with cancellation, deadline and iteration limits
//! - **Agent**: an engine paired with the context it exclusively owns
//!
//! Actions block the loop for their duration; nothing here is async.

mod agent;
mod driver;
mod machine;
mod recovery;
mod transition;

pub use agent::{Agent, ResumeError};
pub use driver::{CancelToken, Driver, RunError, RunOptions, RunReport};
pub use machine::{Engine, EngineError, FireOutcome, Ineligible};
pub use recovery::{RearmFn, Recovery, Verdict};
pub use transition::{Transition, TransitionTable};
