//! Key-value persistence for session data.
//!
//! # Design
//! `KeyValueStore` mirrors a browser's per-origin local storage: synchronous,
//! string-to-string, and infallible from the caller's point of view. Each
//! store instance is one origin scope. `MemoryStore` lives for the process;
//! `FileStore` rewrites a JSON file on every mutation so values survive
//! restarts.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use crate::error::ApiError;

/// Synchronous string store. Single-key reads and writes are atomic.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
    }
}

/// Store backed by a JSON object on disk.
///
/// The in-memory map is authoritative; a failed write is logged and retried
/// on the next mutation or an explicit `flush`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| ApiError::Storage(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(ApiError::Storage(format!("{}: {e}", path.display()))),
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current contents to disk.
    pub fn flush(&self) -> Result<(), ApiError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        self.write(&entries)
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), ApiError> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        fs::write(&self.path, raw)
            .map_err(|e| ApiError::Storage(format!("{}: {e}", self.path.display())))
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        if let Err(e) = self.write(entries) {
            warn!(error = %e, "failed to persist key-value store");
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("userId"), None);
        store.set("userId", "42");
        assert_eq!(store.get("userId").as_deref(), Some("42"));
        store.set("userId", "43");
        assert_eq!(store.get("userId").as_deref(), Some("43"));
        store.remove("userId");
        assert_eq!(store.get("userId"), None);
    }

    #[test]
    fn removing_missing_key_is_a_no_op() {
        let store = MemoryStore::new();
        store.remove("nothing");
        assert_eq!(store.get("nothing"), None);
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("session.json")).unwrap();
        assert_eq!(store.get("userId"), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileStore::open(&path).unwrap();
        store.set("userId", "7");
        store.set("email", "a@b.com");
        store.remove("email");
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("userId").as_deref(), Some("7"));
        assert_eq!(reopened.get("email"), None);
    }

    #[test]
    fn file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        let err = FileStore::open(&path).unwrap_err();
        assert!(matches!(err, ApiError::Storage(_)));
    }

    #[test]
    fn flush_reports_write_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("session.json");
        let store = FileStore::open(&path).unwrap();
        store.set("userId", "1");
        assert_eq!(store.get("userId").as_deref(), Some("1"));
        assert!(matches!(store.flush(), Err(ApiError::Storage(_))));
    }

    #[test]
    fn arc_store_shares_state() {
        let store = Arc::new(MemoryStore::new());
        let other = Arc::clone(&store);
        store.set("email", "x@y.z");
        assert_eq!(other.get("email").as_deref(), Some("x@y.z"));
    }
}
