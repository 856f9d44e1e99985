//! `window.localStorage` backend.

use tracing::warn;

use super::{DurableStore, StorageError};

/// Browser local storage.
///
/// The handle is looked up on every call rather than held, which keeps this
/// type `Send + Sync` even though `web_sys::Storage` is not.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Result<web_sys::Storage, StorageError> {
        web_sys::window()
            .and_then(|window| window.local_storage().ok().flatten())
            .ok_or(StorageError::Unavailable)
    }
}

fn rejected(key: &str, err: &wasm_bindgen::JsValue) -> StorageError {
    StorageError::Rejected {
        key: key.to_owned(),
        reason: format!("{err:?}"),
    }
}

impl DurableStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        let storage = Self::storage().ok()?;
        match storage.get_item(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = ?err, "localStorage read failed");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|err| rejected(key, &err))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|err| rejected(key, &err))
    }
}
