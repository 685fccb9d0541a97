//! Durable string-keyed storage backing the config store.

use std::{
    collections::HashMap,
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::anyhow;
use directories::ProjectDirs;
use parking_lot::Mutex;

use crate::error::StorageError;

/// Fixed key the widget configuration is stored under.
pub const STORAGE_KEY: &str = "weather-widget-config";

/// A best-effort key/value store holding string blobs.
pub trait Storage: Send + Sync + Debug {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Stores each key as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage rooted at the platform data directory.
    pub fn from_project_dirs() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("dev", "weather-widget", "weather-widget")
            .ok_or_else(|| anyhow!("Could not determine platform data directory"))?;

        Ok(Self::new(dirs.data_dir()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { path, source }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(key);
        fs::write(&path, value).map_err(|source| StorageError::Write { path, source })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Remove { path, source }),
        }
    }
}

/// In-process storage. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    writes: usize,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates `key` without counting it as a write.
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.inner.lock().entries.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.inner.lock().writes
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().entries.get(key).cloned()
    }

    /// Makes subsequent writes fail, e.g. to emulate an exhausted quota.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(StorageError::Unavailable("quota exceeded".to_string()));
        }
        inner.entries.insert(key.to_owned(), value.to_owned());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.lock().entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert!(storage.read(STORAGE_KEY).unwrap().is_none());
        assert!(storage.remove(STORAGE_KEY).is_ok());
    }

    #[test]
    fn file_storage_write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        storage.write(STORAGE_KEY, "{\"cities\":[]}").unwrap();
        assert_eq!(storage.read(STORAGE_KEY).unwrap().as_deref(), Some("{\"cities\":[]}"));
        assert!(dir.path().join("nested").join("weather-widget-config.json").exists());

        storage.remove(STORAGE_KEY).unwrap();
        assert!(storage.read(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn memory_storage_counts_writes_and_can_fail() {
        let storage = MemoryStorage::new().with_entry("k", "seed");
        assert_eq!(storage.write_count(), 0);

        storage.write("k", "v1").unwrap();
        assert_eq!(storage.write_count(), 1);

        storage.set_fail_writes(true);
        let err = storage.write("k", "v2").unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(storage.get("k").as_deref(), Some("v1"));
    }

    #[test]
    fn memory_storage_clones_share_state() {
        let storage = MemoryStorage::new();
        let other = storage.clone();

        storage.write("k", "v").unwrap();
        assert_eq!(other.get("k").as_deref(), Some("v"));
    }
}
