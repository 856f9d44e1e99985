//! JSON file storage backend.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::{DurableStore, StorageError, lock};

/// Durable storage kept in a single JSON object file.
///
/// Entries are cached in memory; every write serializes the full map to a
/// sibling temp file and renames it over the original, so a crash leaves
/// either the old or the new file, never a torn one.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`.
    ///
    /// A missing file opens as empty. An unreadable or unparseable file is
    /// logged and also opens as empty; the next write replaces it.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "state file is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "state file unreadable, starting empty");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), keys = entries.len(), "opened state file");

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = temp_path_for(&self.path);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        let mut next = entries.clone();
        apply(&mut next);
        self.commit(&next)?;
        *entries = next;
        Ok(())
    }
}

/// Sibling path a write is staged at before the rename.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if !lock(&self.entries).contains_key(key) {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("shopfront-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_survives_reopen() {
        let path = temp_path();
        let store = FileStore::open(&path);
        store.set("credential", "a.b.c").unwrap();
        store.set("cart", r#"{"version":1,"data":[]}"#).unwrap();
        store.remove("cart").unwrap();
        drop(store);

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("credential").as_deref(), Some("a.b.c"));
        assert_eq!(reopened.get("cart"), None);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let store = FileStore::open(temp_path());
        assert_eq!(store.get("identity"), None);
    }

    #[test]
    fn test_corrupt_file_opens_empty_and_is_replaced() {
        let path = temp_path();
        fs::write(&path, b"{{{ not json").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get("credential"), None);
        store.set("credential", "x.y.z").unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("credential").as_deref(), Some("x.y.z"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        // A directory where the temp file should go makes File::create fail.
        let path = temp_path();
        let store = FileStore::open(&path);
        store.set("cart", "old").unwrap();
        fs::create_dir(temp_path_for(&path)).unwrap();

        assert!(store.set("cart", "new").is_err());
        assert_eq!(store.get("cart").as_deref(), Some("old"));

        fs::remove_dir(temp_path_for(&path)).unwrap();
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_temp_path_never_equals_target() {
        let json = PathBuf::from("/var/lib/shop/state.json");
        assert_eq!(temp_path_for(&json), PathBuf::from("/var/lib/shop/state.json.tmp"));

        let tmp = PathBuf::from("/var/lib/shop/state.tmp");
        assert_eq!(temp_path_for(&tmp), PathBuf::from("/var/lib/shop/state.tmp.tmp"));
        assert_ne!(temp_path_for(&tmp), tmp);

        let bare = PathBuf::from("state");
        assert_eq!(temp_path_for(&bare), PathBuf::from("state.tmp"));
    }

    #[test]
    fn test_tmp_suffixed_state_file_round_trips() {
        let path = std::env::temp_dir().join(format!("shopfront-{}.tmp", uuid::Uuid::new_v4()));
        let store = FileStore::open(&path);
        store.set("credential", "a.b.c").unwrap();
        assert!(!temp_path_for(&path).exists());

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("credential").as_deref(), Some("a.b.c"));
        fs::remove_file(&path).unwrap();
    }
}
