//! Durable storage for [`MonitorState`].

use crate::state::MonitorState;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("State file I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("State file is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Whole-record storage for the monitor state.
///
/// `save` replaces the stored record entirely; there are no partial updates.
pub trait StateStore: Send + Sync {
    /// Load the stored state, or the default state when nothing is stored yet.
    fn load(&self) -> Result<MonitorState, StoreError>;

    /// Overwrite the stored state.
    fn save(&self, state: &MonitorState) -> Result<(), StoreError>;
}

/// JSON file store. Writes go through a sibling temp file and a rename so
/// an interrupted save leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move an unreadable state file to `<name>.corrupt` so the next save
    /// does not destroy it. Returns the new location.
    pub fn quarantine(&self) -> Result<PathBuf, StoreError> {
        let target = self.sibling(".corrupt");
        fs::rename(&self.path, &target).map_err(|e| self.io_error(e))?;
        Ok(target)
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<MonitorState, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No state file at {}, using defaults", self.path.display());
                return Ok(MonitorState::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, state: &MonitorState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(state)?;
        let temp = self.temp_path();
        fs::write(&temp, &bytes).map_err(|e| self.io_error(e))?;
        fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))?;
        debug!(
            messages = state.messages.len(),
            tvl = state.tvl,
            "State saved to {}",
            self.path.display()
        );
        Ok(())
    }
}
