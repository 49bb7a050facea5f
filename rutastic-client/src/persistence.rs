//! The latest executed filter, kept on disk between runs.
//!
//! Saves go through a temporary file in the target directory that is then
//! renamed over the state file, so a crash mid-write never leaves a
//! truncated file behind.

use rutastic_core::RouteQuery;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub latest_query: RouteQuery,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// `None` when no state has been saved yet.
pub fn load(path: &Path) -> Result<Option<PersistedState>, PersistenceError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_str(&contents)?))
}

pub fn save(path: &Path, state: &PersistedState) -> Result<(), PersistenceError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let contents = serde_json::to_vec_pretty(state)?;
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(&contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;
    debug!(path = %path.display(), "Filter state saved");
    Ok(())
}
