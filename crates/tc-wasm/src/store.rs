//! `chrome.storage.local` behind the [`KeyValueStore`] seam.
//!
//! The extension storage API is asynchronous while the store trait is not,
//! so reads are served from an in-memory mirror hydrated at startup and
//! writes update the mirror immediately and are flushed in the background.
//! A failed flush is logged; the mirror keeps the value.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use tc_core::store::{KeyValueStore, StoreError};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;

use crate::chrome;

#[derive(Clone, Default)]
pub struct ChromeStore {
    mirror: Rc<RefCell<HashMap<String, Value>>>,
}

impl ChromeStore {
    /// Load every stored key into a new mirror.
    pub async fn hydrate() -> Self {
        let store = Self::default();
        match chrome::storage_get(JsValue::NULL).await {
            Ok(items) => match serde_wasm_bindgen::from_value::<HashMap<String, Value>>(items) {
                Ok(entries) => *store.mirror.borrow_mut() = entries,
                Err(e) => log::warn!("Ignoring unreadable extension storage: {e}"),
            },
            Err(e) => log::warn!("Extension storage unavailable, starting empty: {}", chrome::error_message(&e)),
        }
        store
    }
}

impl KeyValueStore for ChromeStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.mirror.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set_many(vec![(key, value)])
    }

    fn set_many(&self, entries: Vec<(&str, Value)>) -> Result<(), StoreError> {
        let mut items = Map::new();
        {
            let mut mirror = self.mirror.borrow_mut();
            for (key, value) in entries {
                mirror.insert(key.to_string(), value.clone());
                items.insert(key.to_string(), value);
            }
        }

        let keys: Vec<String> = items.keys().cloned().collect();
        let payload = chrome::to_js(&items).map_err(|e| StoreError::Write {
            key: keys.join(","),
            reason: e.to_string(),
        })?;
        spawn_local(async move {
            if let Err(e) = chrome::storage_set(payload).await {
                log::warn!("Writing {} to extension storage failed: {}", keys.join(","), chrome::error_message(&e));
            }
        });
        Ok(())
    }
}
