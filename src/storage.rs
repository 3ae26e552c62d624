//! Key-value persistence for the task list.
//!
//! [`KeyValueStore`] is the raw string-keyed store (a directory of files, or a map in
//! memory). [`TaskStorage`] sits on top of it and never propagates failures: a failed
//! save or load is logged, remembered in [`TaskStorage::last_error`], and the caller
//! carries on with its in-memory state.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, error, warn};

use crate::error::StorageError;
use crate::task::Task;

pub const DEFAULT_STORAGE_KEY: &str = "kanban-tasks";

/// Roughly what browsers grant a single origin.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

fn check_quota(quota: Option<usize>, value: &str) -> Result<(), StorageError> {
    match quota {
        Some(quota) if value.len() > quota => Err(StorageError::QuotaExceeded {
            needed: value.len(),
            quota,
        }),
        _ => Ok(()),
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<usize>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota: None,
        }
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota, value)?;
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota, value)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Serializes the whole task list under one fixed key.
#[derive(Debug)]
pub struct TaskStorage<S> {
    store: S,
    key: String,
    last_error: Option<String>,
}

impl<S: KeyValueStore> TaskStorage<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            last_error: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The most recent save/load/clear failure, reset by the next successful save or clear.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn save(&mut self, tasks: &[Task]) {
        let result = serde_json::to_string(tasks)
            .map_err(StorageError::from)
            .and_then(|json| self.store.set(&self.key, &json));
        match result {
            Ok(()) => {
                debug!(key = %self.key, count = tasks.len(), "saved tasks");
                self.last_error = None;
            }
            Err(err) => {
                error!(key = %self.key, error = %err, "failed to save tasks");
                self.last_error = Some(format!("Changes were not saved: {err}"));
            }
        }
    }

    /// `None` when nothing is stored or the stored value cannot be read.
    pub fn load(&mut self) -> Option<Vec<Task>> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                error!(key = %self.key, error = %err, "failed to read tasks");
                self.last_error = Some(format!("Saved tasks could not be read: {err}"));
                return None;
            }
        };
        match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => {
                debug!(key = %self.key, count = tasks.len(), "loaded tasks");
                Some(tasks)
            }
            Err(err) => {
                error!(key = %self.key, error = %err, "failed to parse stored tasks");
                self.last_error = Some(format!("Saved tasks could not be read: {err}"));
                None
            }
        }
    }

    pub fn clear(&mut self) {
        match self.store.remove(&self.key) {
            Ok(()) => self.last_error = None,
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to clear stored tasks");
                self.last_error = Some(format!("Stored tasks could not be removed: {err}"));
            }
        }
    }
}
