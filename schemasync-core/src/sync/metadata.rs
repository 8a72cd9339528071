//! Last-known-synced fingerprints
//!
//! Stored next to the queue in the project state directory. Change detection
//! compares current fingerprints against the hashes recorded here.

use crate::persist::{read_json_lenient, write_json_atomic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    Push,
    Pull,
    Sync,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            SyncDirection::Push => "push",
            SyncDirection::Pull => "pull",
            SyncDirection::Sync => "sync",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub local_schema_hash: String,
    pub remote_schema_hash: String,
    pub last_synced_at: DateTime<Utc>,
    pub last_sync_direction: SyncDirection,
}

impl SyncMetadata {
    /// Metadata for a sync that just completed
    pub fn record(direction: SyncDirection, local_hash: &str, remote_hash: &str) -> Self {
        Self {
            local_schema_hash: local_hash.to_string(),
            remote_schema_hash: remote_hash.to_string(),
            last_synced_at: Utc::now(),
            last_sync_direction: direction,
        }
    }

    /// Missing or corrupt metadata reads as no sync history
    pub fn load_lenient(path: &Path) -> Option<Self> {
        read_json_lenient(path)
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        write_json_atomic(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".schemasync").join("sync.json");
        let meta = SyncMetadata::record(SyncDirection::Pull, "sha256:aaaa", "sha256:bbbb");
        meta.save(&path).unwrap();

        let loaded = SyncMetadata::load_lenient(&path).unwrap();
        assert_eq!(loaded, meta);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["lastSyncDirection"], "pull");
        assert_eq!(raw["localSchemaHash"], "sha256:aaaa");
    }

    #[test]
    fn corrupt_metadata_is_no_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync.json");
        assert!(SyncMetadata::load_lenient(&path).is_none());

        std::fs::write(&path, "{\"localSchemaHash\": 3}").unwrap();
        assert!(SyncMetadata::load_lenient(&path).is_none());
    }
}
