//! Checkpoint error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Checkpoint validation failed: {0}")]
    ValidationFailed(String),

    #[error("Checkpoint storage at {path} failed: {reason}")]
    Storage { path: PathBuf, reason: String },

    #[error("Checkpoint store lock poisoned")]
    Poisoned,
}
