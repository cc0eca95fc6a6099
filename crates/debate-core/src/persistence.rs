//! File-backed implementations of [`InteractionStore`].
//!
//! The flag lives in `interaction.json` inside the data directory
//! (`$XDG_DATA_HOME/debate` on Linux, `~/Library/Application Support/debate`
//! on macOS).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ports::{InteractionStore, StoreError};

const STATE_FILE: &str = "interaction.json";
const APP_DIR: &str = "debate";

/// Default data directory for persisted client state.
pub fn default_data_dir() -> Result<PathBuf, StoreError> {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .ok_or(StoreError::NoDataDir)
}

#[derive(Debug, Serialize, Deserialize)]
struct InteractionRecord {
    user_interacted: bool,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Interaction flag stored as a small JSON document.
#[derive(Debug, Clone)]
pub struct JsonInteractionStore {
    path: PathBuf,
}

impl JsonInteractionStore {
    /// Store the flag inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STATE_FILE),
        }
    }

    /// Store the flag in the platform data directory.
    pub fn default_location() -> Result<Self, StoreError> {
        Ok(Self::in_dir(default_data_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl InteractionStore for JsonInteractionStore {
    fn load(&self) -> Result<bool, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(self.io_err(e)),
        };

        let record: InteractionRecord =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(record.user_interacted)
    }

    fn mark_interacted(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let record = InteractionRecord {
            user_interacted: true,
            updated_at: Some(Utc::now()),
        };
        let json = serde_json::to_string_pretty(&record).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&self.path, json).map_err(|e| self.io_err(e))?;

        debug!(path = %self.path.display(), "Persisted interaction flag");
        Ok(())
    }
}

/// Non-persistent store, for `--no-persist` runs and tests.
#[derive(Debug, Default)]
pub struct MemoryInteractionStore {
    interacted: AtomicBool,
}

impl MemoryInteractionStore {
    #[must_use]
    pub fn new(initial: bool) -> Self {
        Self {
            interacted: AtomicBool::new(initial),
        }
    }
}

impl InteractionStore for MemoryInteractionStore {
    fn load(&self) -> Result<bool, StoreError> {
        Ok(self.interacted.load(Ordering::SeqCst))
    }

    fn mark_interacted(&self) -> Result<(), StoreError> {
        self.interacted.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_means_not_interacted() {
        let dir = TempDir::new().unwrap();
        let store = JsonInteractionStore::in_dir(dir.path());
        assert!(!store.load().unwrap());
    }

    #[test]
    fn test_mark_then_load() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("debate");
        let store = JsonInteractionStore::in_dir(&nested);

        store.mark_interacted().unwrap();
        assert!(store.path().exists());

        let reopened = JsonInteractionStore::in_dir(&nested);
        assert!(reopened.load().unwrap());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = JsonInteractionStore::in_dir(dir.path());
        fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryInteractionStore::default();
        assert!(!store.load().unwrap());
        store.mark_interacted().unwrap();
        assert!(store.load().unwrap());
    }
}
