//! Snapshot persistence contract.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::state::snapshot::Snapshot;

/// Errors raised while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load/save contract for engine snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Previously saved snapshot, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<Snapshot>, PersistError>;

    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Pretty-printed JSON file, replaced atomically on save.
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

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>, PersistError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        Ok(Some(Snapshot::from_json_slice(&bytes)?))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        let bytes = snapshot.to_json_pretty()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps the last snapshot in memory; used when on-disk persistence is disabled.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, PersistError> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthRecord;
    use crate::rotation::RotationState;
    use std::collections::BTreeMap;

    fn sample() -> Snapshot {
        let mut records = BTreeMap::new();
        records.insert(
            "Profile 7".to_string(),
            HealthRecord {
                last_success_at: Some(1_700_000_000),
                consecutive_failures: 0,
                next_eligible_at: 1_700_000_000,
                quarantined: false,
            },
        );
        Snapshot {
            rotation: RotationState { group_count: 3, last_group_index: 0, last_cycle_started_at: 1_700_000_000 },
            records,
            proxies: BTreeMap::new(),
            saved_at: 1_700_000_001,
        }
    }

    #[test]
    fn test_missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("server_state.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("server_state.json"));
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server_state.json");
        fs::write(&path, b"{ truncated").unwrap();
        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, PersistError::Json(_)));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
    }
}
