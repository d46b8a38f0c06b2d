//! Block-list refresh configuration.

use serde::{Deserialize, Serialize};
use tc_core::{ResourceType, RuleAction};

pub const DEFAULT_LIST_URL: &str = "https://easylist.to/easylist/easylist.txt";
/// 24 hours.
pub const DEFAULT_MAX_AGE_MS: u64 = 24 * 60 * 60 * 1000;
/// Rule-count ceiling of a single rule batch.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunkSize must be at least 1")]
    ZeroChunkSize,
    #[error("priority must be at least 1")]
    ZeroPriority,
    #[error("resourceTypes must not be empty")]
    NoResourceTypes,
    #[error("listUrl must be an https URL: {0}")]
    InsecureListUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListConfig {
    pub list_url: String,
    /// Cached patterns younger than this are reused without fetching.
    pub max_age_ms: u64,
    pub chunk_size: usize,
    pub fetch_timeout_ms: u64,
    pub priority: u32,
    pub resource_types: ResourceType,
    pub action: RuleAction,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            list_url: DEFAULT_LIST_URL.to_string(),
            max_age_ms: DEFAULT_MAX_AGE_MS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            priority: 1,
            resource_types: ResourceType::TRACKER_DEFAULT,
            action: RuleAction::Allow,
        }
    }
}

impl ListConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.priority == 0 {
            return Err(ConfigError::ZeroPriority);
        }
        if self.resource_types.is_empty() {
            return Err(ConfigError::NoResourceTypes);
        }
        if !self.list_url.to_ascii_lowercase().starts_with("https://") {
            return Err(ConfigError::InsecureListUrl(self.list_url.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ListConfig::default();
        assert_eq!(config.max_age_ms, 86_400_000);
        assert_eq!(config.chunk_size, 10_000);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ListConfig = serde_json::from_str(r#"{"chunkSize": 500, "action": {"type": "block"}}"#).unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.action, RuleAction::Block);
        assert_eq!(config.list_url, DEFAULT_LIST_URL);
        assert_eq!(config.resource_types, ResourceType::TRACKER_DEFAULT);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero = ListConfig { chunk_size: 0, ..ListConfig::default() };
        assert_eq!(zero.validate(), Err(ConfigError::ZeroChunkSize));
        let plain = ListConfig { list_url: "http://example.com/list.txt".into(), ..ListConfig::default() };
        assert!(matches!(plain.validate(), Err(ConfigError::InsecureListUrl(_))));
        let none = ListConfig { resource_types: ResourceType::empty(), ..ListConfig::default() };
        assert_eq!(none.validate(), Err(ConfigError::NoResourceTypes));
    }
}
