//! Destinations for checkpoints written by the persistence hook.

use super::{Checkpoint, CheckpointError};
use crate::core::State;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Persists agent snapshots. Saving the same snapshot twice must be harmless.
pub trait CheckpointStore<S: State, C>: Send + Sync {
    fn save(&self, checkpoint: &Checkpoint<S, C>) -> Result<(), CheckpointError>;

    fn load_latest(&self, agent_id: &str) -> Result<Option<Checkpoint<S, C>>, CheckpointError>;
}

/// In-process store keeping every snapshot in bincode form.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots saved for `agent_id`.
    pub fn saved_count(&self, agent_id: &str) -> usize {
        self.saved
            .lock()
            .map(|saved| saved.get(agent_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Every snapshot saved for `agent_id`, oldest first.
    pub fn all<S: State, C: Serialize + DeserializeOwned>(
        &self,
        agent_id: &str,
    ) -> Result<Vec<Checkpoint<S, C>>, CheckpointError> {
        let saved = self.saved.lock().map_err(|_| CheckpointError::Poisoned)?;
        saved
            .get(agent_id)
            .into_iter()
            .flatten()
            .map(|bytes| Checkpoint::from_bytes(bytes))
            .collect()
    }
}

impl<S, C> CheckpointStore<S, C> for MemoryStore
where
    S: State,
    C: Serialize + DeserializeOwned,
{
    fn save(&self, checkpoint: &Checkpoint<S, C>) -> Result<(), CheckpointError> {
        let bytes = checkpoint.to_bytes()?;
        let mut saved = self.saved.lock().map_err(|_| CheckpointError::Poisoned)?;
        saved
            .entry(checkpoint.agent_id.clone())
            .or_default()
            .push(bytes);
        debug!(agent_id = %checkpoint.agent_id, state = checkpoint.state.name(), "checkpoint saved in memory");
        Ok(())
    }

    fn load_latest(&self, agent_id: &str) -> Result<Option<Checkpoint<S, C>>, CheckpointError> {
        let saved = self.saved.lock().map_err(|_| CheckpointError::Poisoned)?;
        saved
            .get(agent_id)
            .and_then(|snapshots| snapshots.last())
            .map(|bytes| Checkpoint::from_bytes(bytes))
            .transpose()
    }
}

/// One pretty-printed JSON file per agent, replaced on every save.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, agent_id: &str) -> PathBuf {
        self.dir.join(format!("{agent_id}.json"))
    }

    fn storage_error(path: &Path, err: std::io::Error) -> CheckpointError {
        CheckpointError::Storage {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

impl<S, C> CheckpointStore<S, C> for FileStore
where
    S: State,
    C: Serialize + DeserializeOwned,
{
    fn save(&self, checkpoint: &Checkpoint<S, C>) -> Result<(), CheckpointError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::storage_error(&self.dir, e))?;
        let path = self.path_for(&checkpoint.agent_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, checkpoint.to_json()?).map_err(|e| Self::storage_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Self::storage_error(&path, e))?;
        debug!(path = %path.display(), state = checkpoint.state.name(), "checkpoint written");
        Ok(())
    }

    fn load_latest(&self, agent_id: &str) -> Result<Option<Checkpoint<S, C>>, CheckpointError> {
        let path = self.path_for(agent_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|e| Self::storage_error(&path, e))?;
        Checkpoint::from_json(&json).map(Some)
    }
}
