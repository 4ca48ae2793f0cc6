//! Persistence error types.

use crate::engine::{BoxError, EngineError};
use thiserror::Error;

/// Errors raised by the storage collaborator or the stored format.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Reading stored data failed: {source}")]
    Read {
        #[source]
        source: BoxError,
    },

    #[error("Writing stored data failed: {source}")]
    Write {
        #[source]
        source: BoxError,
    },

    #[error("Removing stored data failed: {source}")]
    Remove {
        #[source]
        source: BoxError,
    },

    /// Stored snapshot was written by an incompatible version
    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Errors raised by the lock collaborator.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Acquiring the lock failed: {source}")]
    Lock {
        #[source]
        source: BoxError,
    },

    #[error("Releasing the lock failed: {source}")]
    Unlock {
        #[source]
        source: BoxError,
    },
}

/// Everything [`Instance`](super::Instance) can fail with.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Lock(#[from] LockError),
}
