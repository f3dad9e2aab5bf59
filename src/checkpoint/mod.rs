//! Agent snapshots for the persistence hook and for resuming agents.
//!
//! A checkpoint captures the agent's state and context at the moment a
//! state was entered. Transition actions are not part of it; they are
//! rebuilt from the table when an agent resumes.

use crate::core::State;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod store;

pub use error::CheckpointError;
pub use store::{CheckpointStore, FileStore, MemoryStore};

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable snapshot of one agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "C: Serialize + DeserializeOwned")]
pub struct Checkpoint<S: State, C> {
    pub version: u32,
    pub id: String,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub state: S,
    pub context: C,
    /// Trigger whose entry produced the snapshot.
    pub trigger: String,
}

impl<S: State, C: Serialize + DeserializeOwned> Checkpoint<S, C> {
    pub fn capture(agent_id: &str, state: S, context: C, trigger: &str) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.to_string(),
            timestamp: Utc::now(),
            state,
            context,
            trigger: trigger.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: Self = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        if self.agent_id.is_empty() {
            return Err(CheckpointError::ValidationFailed(
                "agent_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
