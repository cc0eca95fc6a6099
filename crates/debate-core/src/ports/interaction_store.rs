//! Persisted "user has interacted" flag.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading or writing persisted client state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt state file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("No data directory available on this platform")]
    NoDataDir,
}

/// Storage for the single interaction flag.
///
/// Read once at startup to pre-seed the interaction gate, written once when
/// the gate first opens.
#[cfg_attr(test, mockall::automock)]
pub trait InteractionStore: Send + Sync {
    /// Whether the user interacted in an earlier session.
    fn load(&self) -> Result<bool, StoreError>;

    /// Persist that the user has interacted.
    fn mark_interacted(&self) -> Result<(), StoreError>;
}
