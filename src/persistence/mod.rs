//! Persisting instances between calls.
//!
//! The engine itself is pure. This module is the thin shell around it: an
//! envelope for stored snapshots, the storage and lock collaborator traits,
//! and [`Instance`], which runs one call under the lock.

use crate::engine::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;
mod instance;
mod storage;

pub use error::{InstanceError, LockError, StorageError};
pub use instance::Instance;
pub use storage::{
    run_or_recover, CheckedLock, CheckedStorage, CheckedUnlock, Lock, MemoryLock, MemoryStorage,
    Storage, Unlock,
};

/// Version identifier for the stored snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Snapshot as handed to the storage collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    /// Stored format version
    pub version: u32,

    /// When the snapshot was produced
    pub saved_at: DateTime<Utc>,

    #[serde(flatten)]
    pub snapshot: Snapshot,
}

impl StoredSnapshot {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            snapshot,
        }
    }

    /// Unwrap the snapshot, rejecting versions this build cannot read.
    pub fn into_snapshot(self) -> Result<Snapshot, StorageError> {
        self.check_version()?;
        Ok(self.snapshot)
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let stored: Self = serde_json::from_str(json)?;
        stored.check_version()?;
        Ok(stored)
    }

    fn check_version(&self) -> Result<(), StorageError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Configuration;
    use serde_json::json;

    fn sample() -> StoredSnapshot {
        StoredSnapshot::new(Snapshot {
            configuration: Configuration::from_pairs([("main", "main:A")]),
            context: json!({"count": 3}),
        })
    }

    #[test]
    fn json_round_trip_keeps_snapshot() {
        let stored = sample();

        let restored = StoredSnapshot::from_json(&stored.to_json().unwrap()).unwrap();

        assert_eq!(restored, stored);
    }

    #[test]
    fn snapshot_fields_are_flattened() {
        let value = serde_json::to_value(sample()).unwrap();

        assert_eq!(value["version"], json!(SNAPSHOT_VERSION));
        assert_eq!(value["context"], json!({"count": 3}));
        assert_eq!(value["configuration"]["active"]["main"], json!("main:A"));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut stored = sample();
        stored.version = 99;

        let json = stored.to_json().unwrap();

        assert!(matches!(
            StoredSnapshot::from_json(&json),
            Err(StorageError::UnsupportedVersion {
                found: 99,
                supported: SNAPSHOT_VERSION
            })
        ));
        assert!(matches!(
            stored.into_snapshot(),
            Err(StorageError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn malformed_json_is_an_encoding_error() {
        assert!(matches!(
            StoredSnapshot::from_json("{\"version\": 1"),
            Err(StorageError::Encoding(_))
        ));
    }
}
