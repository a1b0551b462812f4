use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use thiserror::Error;
use tracing::{debug, warn};

pub const LAST_PREDICTION_KEY: &str = "healthSphere:lastPrediction";
pub const ALL_PREDICTIONS_KEY: &str = "healthSphere:allPredictions";
pub const USERS_KEY: &str = "healthSphere:users";
pub const ROLE_KEY: &str = "healthSphere:role";
pub const EMAIL_KEY: &str = "healthSphere:email";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write store file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode store contents: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key-value storage scoped to a single profile.
///
/// Reads and removals never fail; a missing or unreadable value is simply
/// absent. Writes report backend failures so callers can decide what to do.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}

/// A profile persisted as one JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "store file is not valid JSON, starting fresh");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read store file, starting fresh");
                HashMap::new()
            }
        };
        debug!(path = %path.display(), keys = entries.len(), "opened file store");

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(entries)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }
        fs::write(&self.path, encoded).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        // Memory only changes once the file holds the new contents.
        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if !entries.contains_key(key) {
            return;
        }
        let mut updated = entries.clone();
        updated.remove(key);
        match self.flush(&updated) {
            Ok(()) => *entries = updated,
            Err(err) => warn!(key, error = %err, "failed to persist removal, keeping value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get(ROLE_KEY), None);

        store.set(ROLE_KEY, "admin").unwrap();
        assert_eq!(store.get(ROLE_KEY).as_deref(), Some("admin"));

        store.remove(ROLE_KEY);
        assert_eq!(store.get(ROLE_KEY), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");

        let store = FileStore::open(&path);
        store.set(EMAIL_KEY, "nurse@hospital.com").unwrap();
        store.set(ROLE_KEY, "user").unwrap();
        store.remove(ROLE_KEY);
        drop(store);

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get(EMAIL_KEY).as_deref(), Some("nurse@hospital.com"));
        assert_eq!(reopened.get(ROLE_KEY), None);
    }

    #[test]
    fn unreadable_store_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get(USERS_KEY), None);
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be written as a file.
        let store = FileStore::open(dir.path());

        assert!(matches!(store.set(ROLE_KEY, "admin"), Err(StoreError::Write { .. })));
        assert_eq!(store.get(ROLE_KEY), None);
    }

    #[test]
    fn failed_removal_keeps_the_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let store = FileStore::open(&path);
        store.set(ROLE_KEY, "user").unwrap();

        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        store.remove(ROLE_KEY);

        assert_eq!(store.get(ROLE_KEY).as_deref(), Some("user"));
    }
}
