//! Native implementations of the refresh seams.

use std::path::PathBuf;
use std::time::Duration;

use tc_compiler::{ListSource, RefreshError, RuleEngine, RuleUpdate};

use crate::output::{batch_file_name, write_json};

/// Downloads the block list over HTTP.
#[derive(Default)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl ListSource for HttpSource {
    async fn fetch_list(&self, url: &str, timeout_ms: u64) -> Result<String, RefreshError> {
        let url = url
            .parse::<reqwest::Url>()
            .map_err(|e| RefreshError::Transport(format!("Invalid list url: {e}")))?;
        let res = self
            .client
            .get(url)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;
        if !res.status().is_success() {
            return Err(RefreshError::Status(res.status().as_u16()));
        }
        res.text().await.map_err(|e| RefreshError::Transport(e.to_string()))
    }
}

/// Writes each installed batch as a static ruleset file.
pub struct RulesetDir {
    dir: PathBuf,
    chunk_size: usize,
}

impl RulesetDir {
    pub fn new(dir: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            dir: dir.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Delete ruleset files numbered past `batches`, left by a longer list.
    pub fn prune(&self, batches: usize) -> Result<usize, String> {
        let mut removed = 0;
        let mut index = batches;
        loop {
            let path = self.dir.join(batch_file_name(index));
            if !path.exists() {
                return Ok(removed);
            }
            std::fs::remove_file(&path).map_err(|e| format!("Failed to remove '{}': {}", path.display(), e))?;
            removed += 1;
            index += 1;
        }
    }
}

impl RuleEngine for RulesetDir {
    async fn update_rules(&self, update: RuleUpdate) -> Result<(), String> {
        let Some(first) = update.add_rules.first() else {
            return Ok(());
        };
        let index = (first.id as usize).saturating_sub(1) / self.chunk_size;
        let path = self.dir.join(batch_file_name(index));
        write_json(&path, &update.add_rules)?;
        log::debug!("Wrote {} rules to {}", update.add_rules.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_compiler::{build_batches, ListConfig};

    #[tokio::test]
    async fn test_batches_land_in_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = ListConfig { chunk_size: 2, ..ListConfig::default() };
        let patterns: Vec<String> = (0..3).map(|i| format!("d{i}.com/*")).collect();
        let engine = RulesetDir::new(dir.path(), config.chunk_size);

        for batch in build_batches(&patterns, &config) {
            engine.update_rules(batch.to_update(&[])).await.unwrap();
        }
        assert!(dir.path().join("rules_1.json").exists());
        assert!(dir.path().join("rules_2.json").exists());

        std::fs::write(dir.path().join("rules_3.json"), "[]").unwrap();
        assert_eq!(engine.prune(2).unwrap(), 1);
        assert!(!dir.path().join("rules_3.json").exists());
        assert!(dir.path().join("rules_2.json").exists());
    }
}
