//! Local persisted key/value storage.
//!
//! The storefront keeps its cart snapshot, theme preference and auth session
//! in a string-keyed store, JSON-encoded. Failures are never fatal: readers
//! get `None`, writers log and move on, and the app keeps working from memory.
//!
//! Two backends:
//! - [`FileStorage`]: one file per key under a data directory
//! - [`MemoryStorage`]: a shared in-process map, for tests and ephemeral runs

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// A string-keyed key/value store.
pub trait LocalStorage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value, treating every failure as absence.
pub fn load_json<T: DeserializeOwned>(storage: &dyn LocalStorage, key: &str) -> Option<T> {
    let raw = match storage.get_item(key) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::debug!(key, error = %e, "Local storage read failed");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(key, error = %e, "Ignoring unreadable local storage value");
            None
        }
    }
}

/// Encode and store a JSON value, ignoring failures.
pub fn save_json<T: Serialize + ?Sized>(storage: &dyn LocalStorage, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => save_raw(storage, key, &raw),
        Err(e) => tracing::warn!(key, error = %e, "Local storage encode failed"),
    }
}

/// Read a plain-text value and parse it, treating every failure as absence.
pub fn load_parsed<T>(storage: &dyn LocalStorage, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = match storage.get_item(key) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::debug!(key, error = %e, "Local storage read failed");
            return None;
        }
    };

    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(key, error = %e, "Ignoring unreadable local storage value");
            None
        }
    }
}

/// Store a plain-text value, ignoring failures.
pub fn save_raw(storage: &dyn LocalStorage, key: &str, value: &str) {
    if let Err(e) = storage.set_item(key, value) {
        tracing::warn!(key, error = %e, "Local storage write failed");
    }
}

/// Remove a key, ignoring failures.
pub fn remove(storage: &dyn LocalStorage, key: &str) {
    if let Err(e) = storage.remove_item(key) {
        tracing::warn!(key, error = %e, "Local storage remove failed");
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// Filesystem-backed storage: `<base_dir>/<key>.json`.
#[derive(Clone, Debug)]
pub struct FileStorage {
    base: PathBuf,
}

impl FileStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Directory holding the stored values.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.base.join(format!("{key}.json")))
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.base)?;

        // Write beside the target and rename so readers never see half a value.
        let tmp = path.with_extension("json.tmp");
        write_private(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `value` to a file only the owner can read; it may hold tokens.
fn write_private(path: &Path, value: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

    let mut file = options.open(path)?;
    // A leftover temp file keeps its old mode.
    #[cfg(unix)]
    file.set_permissions(std::os::unix::fs::PermissionsExt::from_mode(0o600))?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-memory storage. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.remove(key);
        Ok(())
    }
}
