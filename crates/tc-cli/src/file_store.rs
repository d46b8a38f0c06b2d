//! JSON-file [`KeyValueStore`] so CLI refreshes share the extension's keys.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tc_core::store::{KeyValueStore, StoreError};

pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Decode {
                key: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(StoreError::Unavailable(format!("{}: {}", path.display(), e))),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &Map<String, Value>, keys: &str) -> Result<(), StoreError> {
        let write_error = |reason: String| StoreError::Write {
            key: keys.to_string(),
            reason,
        };
        let json = serde_json::to_string_pretty(entries).map_err(|e| write_error(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| write_error(format!("{}: {}", self.path.display(), e)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set_many(vec![(key, value)])
    }

    fn set_many(&self, new_entries: Vec<(&str, Value)>) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
        let keys: Vec<&str> = new_entries.iter().map(|(key, _)| *key).collect();
        let keys = keys.join(",");
        for (key, value) in new_entries {
            entries.insert(key.to_string(), value);
        }
        self.flush(&entries, &keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("lastEasyListFetch").unwrap(), None);
        store
            .set_many(vec![("lastEasyListFetch", json!(5)), ("easyListRules", json!(["a.com/*"]))])
            .unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("lastEasyListFetch").unwrap(), Some(json!(5)));
        assert_eq!(reopened.get("easyListRules").unwrap(), Some(json!(["a.com/*"])));
    }

    #[test]
    fn test_corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Decode { .. })));
    }
}
