//! JSON snapshot store.
//!
//! One pretty-printed JSON file per snapshot name under a base directory.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! reader never sees a half-written file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

/// Snapshot persistence failure.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem failure.
    #[error("snapshot io error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Encoding or decoding failure.
    #[error("snapshot {name} could not be (de)serialized: {source}")]
    Serde {
        /// Snapshot name.
        name: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Name that would escape the base directory.
    #[error("invalid snapshot name: {name}")]
    InvalidName {
        /// Offending name.
        name: String,
    },
}

/// File-backed store for serde snapshots.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    base_dir: PathBuf,
}

impl JsonSnapshotStore {
    /// Store rooted at `base_dir`. The directory is created on first save.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path a snapshot name maps to.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, SnapshotError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SnapshotError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(self.base_dir.join(format!("{name}.json")))
    }

    /// Write `snapshot` under `name`, replacing any previous one.
    pub fn save<T: Serialize>(&self, name: &str, snapshot: &T) -> Result<PathBuf, SnapshotError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.base_dir).map_err(|source| SnapshotError::Io {
            path: self.base_dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(snapshot).map_err(|source| SnapshotError::Serde {
            name: name.to_string(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| SnapshotError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| SnapshotError::Io {
            path: path.clone(),
            source,
        })?;

        info!(name, path = %path.display(), "Snapshot saved");
        Ok(path)
    }

    /// Read the snapshot saved under `name`; `Ok(None)` when there is none.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, SnapshotError> {
        let path = self.path_for(name)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(name, "No snapshot on disk");
                return Ok(None);
            }
            Err(source) => return Err(SnapshotError::Io { path, source }),
        };
        let snapshot = serde_json::from_str(&content).map_err(|source| SnapshotError::Serde {
            name: name.to_string(),
            source,
        })?;
        Ok(Some(snapshot))
    }

    /// Delete the snapshot saved under `name`. Returns whether one existed.
    pub fn remove(&self, name: &str) -> Result<bool, SnapshotError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SnapshotError::Io { path, source }),
        }
    }
}
