//! Persistent key-value storage
//!
//! The storefront mirrors its cart, wishlist and in-flight receipt into a
//! small key-value store so a reload picks up where the shopper left off.
//! Ledgers receive the store as an `Arc<dyn Storage>` and write through it
//! after every mutation.

use std::{
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use rustc_hash::FxHashMap;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

/// Storage key for the cart ledger.
pub const CART_KEY: &str = "cart";

/// Storage key for the wishlist ledger.
pub const WISHLIST_KEY: &str = "wishlist";

/// Storage key for the in-flight order receipt.
pub const RECEIPT_KEY: &str = "receipt";

/// Storage key for the signed-in user's profile.
pub const USER_KEY: &str = "user";

/// Errors raised by a [`Storage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Writing the value would exceed the configured quota.
    #[error("storing {key} needs {needed} bytes but only {available} are free")]
    QuotaExceeded {
        /// Key being written
        key: String,

        /// Bytes the write needs
        needed: usize,

        /// Bytes still available
        available: usize,
    },

    /// A filesystem operation failed.
    #[error("storage io error")]
    Io(#[from] io::Error),

    /// The in-memory map was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,

    /// Key contains characters that cannot be used as a file name.
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
}

/// A string key-value store.
pub trait Storage: Send + Sync + Debug {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage, optionally limited to a byte quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<FxHashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Unbounded in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory storage that refuses writes once keys and values together
    /// exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(bytes),
        }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_poisoned| StorageError::Poisoned)?;

        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_poisoned| StorageError::Poisoned)?;

        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(used);

            if needed > available {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_poisoned| StorageError::Poisoned)?;

        entries.remove(key);

        Ok(())
    }
}

/// Storage backed by one JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();

        fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    /// The directory holding the stored files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let staging = path.with_extension("json.tmp");

        let written = fs::write(&staging, value).and_then(|()| fs::rename(&staging, &path));

        if let Err(error) = written {
            if let Err(cleanup) = fs::remove_file(&staging)
                && cleanup.kind() != io::ErrorKind::NotFound
            {
                warn!(path = %staging.display(), error = %cleanup, "failed to remove staging file");
            }

            return Err(error.into());
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

/// Decode the JSON value under `key`.
///
/// A missing key, an unreadable backend and undecodable contents all yield
/// `None`; the latter two are logged.
pub fn read_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = match storage.get(key) {
        Ok(raw) => raw?,
        Err(error) => {
            warn!(key, %error, "failed to read persisted state");

            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, %error, "discarding undecodable persisted state");

            None
        }
    }
}

/// Encode `value` as JSON and store it under `key`.
///
/// Failures are logged and swallowed: the in-memory state the caller just
/// changed stays authoritative. Returns whether the write landed.
pub fn write_json<T: Serialize>(storage: &dyn Storage, key: &str, value: &T) -> bool {
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(error) => {
            warn!(key, %error, "failed to encode state for persistence");

            return false;
        }
    };

    match storage.set(key, &encoded) {
        Ok(()) => {
            debug!(key, bytes = encoded.len(), "persisted state");

            true
        }
        Err(error) => {
            warn!(key, %error, "failed to persist state");

            false
        }
    }
}

/// Remove `key`, logging failures.
pub fn forget(storage: &dyn Storage, key: &str) -> bool {
    match storage.remove(key) {
        Ok(()) => true,
        Err(error) => {
            warn!(key, %error, "failed to remove persisted state");

            false
        }
    }
}
