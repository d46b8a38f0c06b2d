//! Persisted result of the last successful block-list fetch.

use tc_core::store::{encode, get_typed, KeyValueStore, StoreError, LAST_FETCH_KEY, RULES_KEY};

/// Last-fetch timestamp plus the optimized patterns it produced.
///
/// `rules` is only non-empty after a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchCacheRecord {
    /// Epoch-millis of the last successful fetch
    pub timestamp: Option<u64>,
    pub rules: Vec<String>,
}

impl FetchCacheRecord {
    pub fn new(timestamp: u64, rules: Vec<String>) -> Self {
        Self {
            timestamp: Some(timestamp),
            rules,
        }
    }

    pub fn load<K: KeyValueStore + ?Sized>(store: &K) -> Result<Self, StoreError> {
        Ok(Self {
            timestamp: get_typed(store, LAST_FETCH_KEY)?,
            rules: get_typed(store, RULES_KEY)?.unwrap_or_default(),
        })
    }

    pub fn save<K: KeyValueStore + ?Sized>(&self, store: &K) -> Result<(), StoreError> {
        store.set_many(vec![
            (RULES_KEY, encode(RULES_KEY, &self.rules)?),
            (LAST_FETCH_KEY, encode(LAST_FETCH_KEY, &self.timestamp)?),
        ])
    }

    /// Milliseconds since the last fetch. `None` when there was none or the
    /// timestamp lies in the future.
    pub fn age_ms(&self, now_ms: u64) -> Option<u64> {
        self.timestamp.and_then(|ts| now_ms.checked_sub(ts))
    }

    /// Whether a fetch can be skipped at `now_ms`.
    pub fn is_fresh(&self, now_ms: u64, max_age_ms: u64) -> bool {
        matches!(self.age_ms(now_ms), Some(age) if age < max_age_ms)
    }

    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }
}
