//! Durable key-value storage.
//!
//! The stores persist through the [`DurableStore`] trait so the same session
//! and cart logic runs over `window.localStorage` in the browser, a JSON file
//! on disk for the CLI, or an in-memory map in tests.
//!
//! # Backends
//!
//! - [`MemoryStore`] - shared in-process map; clones share entries
//! - [`FileStore`] - one JSON file, replaced atomically on every write
//! - `LocalStorage` - browser storage (requires the `browser` feature)

#[cfg(feature = "browser")]
mod browser;
mod file;
mod memory;
mod record;

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

#[cfg(feature = "browser")]
pub use browser::LocalStorage;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{SCHEMA_VERSION, StorageCorrupt, decode_record, encode_record};

/// Errors raised when a write to durable storage does not land.
///
/// A failed write leaves the previously stored value in place.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The value could not be encoded for storage.
    #[error("failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),

    /// Browser storage is not available (no window, or storage disabled).
    #[error("browser storage unavailable")]
    Unavailable,

    /// The backend refused the write (quota exceeded, private mode, ...).
    #[error("storage rejected write to {key}: {reason}")]
    Rejected {
        /// Key being written.
        key: String,
        /// Backend-provided reason.
        reason: String,
    },
}

/// Synchronous string key-value storage that survives process restarts.
///
/// Reads never fail: a backend that cannot read reports the key as absent.
/// Writes either land completely or leave the prior value in place.
pub trait DurableStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write did not land.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the removal did not land.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Names of the keys the stores persist under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Raw bearer credential.
    pub credential: String,
    /// Versioned identity record.
    pub identity: String,
    /// Versioned cart record.
    pub cart: String,
}

impl StorageKeys {
    /// Keys with `prefix` prepended to the bare names.
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            credential: format!("{prefix}credential"),
            identity: format!("{prefix}identity"),
            cart: format!("{prefix}cart"),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::with_prefix("")
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys_are_bare() {
        let keys = StorageKeys::default();
        assert_eq!(keys.credential, "credential");
        assert_eq!(keys.identity, "identity");
        assert_eq!(keys.cart, "cart");
    }

    #[test]
    fn test_prefixed_keys() {
        let keys = StorageKeys::with_prefix("shop.");
        assert_eq!(keys.credential, "shop.credential");
        assert_eq!(keys.cart, "shop.cart");
    }
}
