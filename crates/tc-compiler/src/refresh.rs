//! Block-list refresh: freshness gate, fetch, compile, install, persist.
//!
//! `refresh` is meant to run as a fire-and-forget background task, so it
//! never returns an error. Every failure is logged and resolved to one of the
//! [`RefreshOutcome`] variants: a failed cycle falls back to the cached
//! patterns when there are any and otherwise leaves the installed rules alone.

use tc_core::store::{KeyValueStore, StoreError};

use crate::builder::{compile_list, rule_id, RuleUpdate};
use crate::cache::FetchCacheRecord;
use crate::config::ListConfig;

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("Block list fetch failed: {0}")]
    Transport(String),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("Block list contained no usable patterns")]
    EmptyList,
    #[error("Rule engine rejected chunk {batch}: {reason}")]
    RuleEngine { batch: usize, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Downloads the block-list document.
#[allow(async_fn_in_trait)]
pub trait ListSource {
    /// Fetch `url`, giving up after `timeout_ms`. Non-2xx responses must be
    /// reported as [`RefreshError::Status`].
    async fn fetch_list(&self, url: &str, timeout_ms: u64) -> Result<String, RefreshError>;
}

/// Declarative request-filtering engine.
#[allow(async_fn_in_trait)]
pub trait RuleEngine {
    async fn update_rules(&self, update: RuleUpdate) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Cache was fresh; nothing fetched.
    Cached { rules: Vec<String> },
    /// A new list was fetched and installed.
    Installed { rules: Vec<String>, batches: usize },
    /// This cycle failed; previously cached patterns stay in effect.
    FellBack { rules: Vec<String> },
    /// This cycle failed and there was nothing cached.
    Failed,
}

impl RefreshOutcome {
    /// Patterns in effect after the refresh.
    pub fn rules(&self) -> &[String] {
        match self {
            Self::Cached { rules } | Self::Installed { rules, .. } | Self::FellBack { rules } => rules,
            Self::Failed => &[],
        }
    }
}

pub struct ListRefresher<S, E, K> {
    source: S,
    engine: E,
    store: K,
    config: ListConfig,
}

impl<S, E, K> ListRefresher<S, E, K>
where
    S: ListSource,
    E: RuleEngine,
    K: KeyValueStore,
{
    pub fn new(source: S, engine: E, store: K, config: ListConfig) -> Self {
        Self {
            source,
            engine,
            store,
            config,
        }
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run one refresh cycle at `now_ms`.
    pub async fn refresh(&self, now_ms: u64) -> RefreshOutcome {
        let cached = FetchCacheRecord::load(&self.store).unwrap_or_else(|e| {
            log::warn!("Could not read block-list cache: {e}");
            FetchCacheRecord::default()
        });

        if cached.has_rules() && cached.is_fresh(now_ms, self.config.max_age_ms) {
            log::info!("Using cached block-list rules ({} patterns)", cached.rules.len());
            return RefreshOutcome::Cached { rules: cached.rules };
        }

        match self.fetch_and_install(now_ms, cached.rules.len()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Block-list refresh failed: {e}");
                if cached.has_rules() {
                    log::info!("Falling back to cached block-list rules");
                    RefreshOutcome::FellBack { rules: cached.rules }
                } else {
                    RefreshOutcome::Failed
                }
            }
        }
    }

    async fn fetch_and_install(&self, now_ms: u64, previous_len: usize) -> Result<RefreshOutcome, RefreshError> {
        log::info!("Fetching block list from {}", self.config.list_url);
        let text = self
            .source
            .fetch_list(&self.config.list_url, self.config.fetch_timeout_ms)
            .await?;

        let compiled = compile_list(&text, &self.config);
        if compiled.patterns.is_empty() {
            return Err(RefreshError::EmptyList);
        }

        let stale = stale_ids(compiled.patterns.len(), previous_len);
        let total = compiled.batches.len();
        for batch in &compiled.batches {
            let extra: &[u32] = if batch.index + 1 == total { &stale } else { &[] };
            self.engine
                .update_rules(batch.to_update(extra))
                .await
                .map_err(|reason| RefreshError::RuleEngine { batch: batch.index, reason })?;
            log::info!("Updated chunk {}/{}", batch.index + 1, total);
        }
        log::info!("Successfully updated all rule chunks");

        let record = FetchCacheRecord::new(now_ms, compiled.patterns);
        if let Err(e) = record.save(&self.store) {
            log::warn!("Installed rules but could not persist block-list cache: {e}");
        }

        Ok(RefreshOutcome::Installed {
            rules: record.rules,
            batches: total,
        })
    }
}

/// Ids installed by a previous, longer list that the new list no longer covers.
fn stale_ids(new_len: usize, previous_len: usize) -> Vec<u32> {
    (new_len..previous_len)
        .map(|index| rule_id(0, previous_len, index))
        .collect()
}
