//! An agent: one engine, one context, one driver.

use crate::checkpoint::{Checkpoint, CheckpointError};
use crate::core::State;
use crate::engine::driver::{CancelToken, Driver, RunError, RunReport};
use crate::engine::machine::{Engine, EngineError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("checkpoint belongs to agent '{found}', expected '{expected}'")]
    AgentMismatch { expected: String, found: String },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Owns the context exclusively for the whole run. Agents share nothing,
/// so independent agents can run on separate threads.
pub struct Agent<S: State, C> {
    id: String,
    engine: Engine<S, C>,
    context: C,
    driver: Driver,
}

impl<S: State, C> Agent<S, C> {
    pub fn new(id: impl Into<String>, engine: Engine<S, C>, context: C, driver: Driver) -> Self {
        Self {
            id: id.into(),
            engine,
            context,
            driver,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &S {
        self.engine.current_state()
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn engine(&self) -> &Engine<S, C> {
        &self.engine
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.driver.cancel_token()
    }

    /// Run until a terminal state or an unrecoverable failure.
    pub fn run(&mut self) -> Result<RunReport<S>, RunError> {
        info!(agent_id = %self.id, state = self.engine.current_state().name(), "agent starting");
        self.driver.run(&mut self.engine, &mut self.context)
    }

    pub fn into_parts(self) -> (Engine<S, C>, C) {
        (self.engine, self.context)
    }
}

impl<S: State, C: Clone + Serialize + DeserializeOwned> Agent<S, C> {
    pub fn checkpoint(&self, trigger: &str) -> Checkpoint<S, C> {
        Checkpoint::capture(
            &self.id,
            self.engine.current_state().clone(),
            self.context.clone(),
            trigger,
        )
    }

    /// Continue from a persisted snapshot.
    ///
    /// The context is replaced and the engine moved to the saved state. A
    /// non-initial, non-terminal state is re-entered so its on-enter
    /// actions (monitoring, for instance) run again before the loop resumes.
    pub fn resume(&mut self, checkpoint: Checkpoint<S, C>) -> Result<(), ResumeError> {
        checkpoint.validate()?;
        if checkpoint.agent_id != self.id {
            return Err(ResumeError::AgentMismatch {
                expected: self.id.clone(),
                found: checkpoint.agent_id,
            });
        }

        self.context = checkpoint.context;
        self.engine.restore(checkpoint.state.clone())?;
        info!(agent_id = %self.id, state = checkpoint.state.name(), "agent resumed from checkpoint");

        let state = checkpoint.state;
        if !self.engine.is_final() && &state != self.engine.initial_state() {
            self.engine.reenter(state, &mut self.context)?;
        }
        Ok(())
    }
}
