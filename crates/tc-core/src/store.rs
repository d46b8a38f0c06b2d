//! Key/value persistence seam.
//!
//! The extension persists through `chrome.storage.local`, the CLI through a
//! JSON file; both sit behind [`KeyValueStore`]. Values are JSON so the same
//! keys read identically from either side.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Epoch-millis of the last successful block-list fetch.
pub const LAST_FETCH_KEY: &str = "lastEasyListFetch";
/// Optimized block-list patterns from the last successful fetch.
pub const RULES_KEY: &str = "easyListRules";
/// Aggregate counts of the current tab.
pub const TRACKER_COUNT_KEY: &str = "trackerCount";
/// Tab the persisted aggregate belongs to.
pub const TRACKER_TAB_KEY: &str = "trackerTabId";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to write '{key}': {reason}")]
    Write { key: String, reason: String },
    #[error("Failed to encode '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to decode '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Write several keys. Implementations backed by a batch API should
    /// override this to write them together.
    fn set_many(&self, entries: Vec<(&str, Value)>) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn set_many(&self, entries: Vec<(&str, Value)>) -> Result<(), StoreError> {
        (**self).set_many(entries)
    }
}

/// Read and decode a typed value.
pub fn get_typed<T, S>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Decode { key: key.to_string(), source }),
    }
}

/// Encode a typed value as JSON.
pub fn encode<T: Serialize>(key: &str, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Encode { key: key.to_string(), source })
}

/// Process-local store.
///
/// [`MemoryStore::set_unavailable`] makes every call fail, which is how an
/// unreachable persistence layer is simulated.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Copy of every stored entry.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.check()?;
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.check()?;
        let mut entries = self.entries.lock().map_err(|_| StoreError::Write {
            key: key.to_string(),
            reason: "memory store poisoned".into(),
        })?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackerCountVector;

    #[test]
    fn test_typed_roundtrip_and_null() {
        let store = MemoryStore::new();
        let counts = TrackerCountVector { storage: 2, ..TrackerCountVector::ZERO };
        store.set(TRACKER_COUNT_KEY, encode(TRACKER_COUNT_KEY, &counts).unwrap()).unwrap();
        assert_eq!(get_typed::<TrackerCountVector, _>(&store, TRACKER_COUNT_KEY).unwrap(), Some(counts));

        store.set(TRACKER_TAB_KEY, Value::Null).unwrap();
        assert_eq!(get_typed::<i32, _>(&store, TRACKER_TAB_KEY).unwrap(), None);
        assert_eq!(get_typed::<i32, _>(&store, "missing").unwrap(), None);
    }

    #[test]
    fn test_decode_error_names_key() {
        let store = MemoryStore::new();
        store.set(LAST_FETCH_KEY, Value::String("yesterday".into())).unwrap();
        let err = get_typed::<u64, _>(&store, LAST_FETCH_KEY).unwrap_err();
        assert!(err.to_string().contains(LAST_FETCH_KEY));
    }

    #[test]
    fn test_unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(store.get(RULES_KEY).is_err());
        assert!(store.set(RULES_KEY, Value::Null).is_err());
        store.set_unavailable(false);
        assert!(store.get(RULES_KEY).unwrap().is_none());
    }
}
