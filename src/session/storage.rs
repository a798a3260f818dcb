//! Durable key/value backends for the persisted session.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session is mirrored into two string entries (`token`, `user`) the way a
//! browser app keeps them in `localStorage`. [`FileStorage`] is the CLI's
//! durable backend; [`MemoryStorage`] backs tests and embedders that do not
//! want anything on disk.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::ApiError;

/// String key/value storage that survives process restarts (or not, for memory).
pub trait SessionStorage: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, ApiError>;

    /// Write several entries as one update.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the backend cannot be written.
    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), ApiError>;

    /// Remove several entries as one update. Missing keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the backend cannot be written.
    fn remove_all(&self, keys: &[&str]) -> Result<(), ApiError>;
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_all(&self, pairs: &[(&str, &str)]) -> Result<(), ApiError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in pairs {
            entries.insert((*key).to_owned(), (*value).to_owned());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), ApiError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// JSON object file holding string entries. Writes go through a temp file and
/// a rename so a crash never leaves a half-written session behind.
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, ApiError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(storage_error(&self.path, &e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| storage_error(&self.path, &e))
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, &e))?;
        }
        let text = serde_json::to_string_pretty(entries).map_err(|e| storage_error(&self.path, &e))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, text).map_err(|e| storage_error(&tmp, &e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, &e))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set_all(&self, pairs: &[(&str, &str)]) -> Result<(), ApiError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries()?;
        for (key, value) in pairs {
            entries.insert((*key).to_owned(), (*value).to_owned());
        }
        self.write_entries(&entries)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), ApiError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries()?;
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() == before {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

fn storage_error(path: &Path, err: &dyn std::fmt::Display) -> ApiError {
    ApiError::Storage(format!("{}: {err}", path.display()))
}
