use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tc_compiler::{ListConfig, RuleBatch};

/// Read a partial JSON [`ListConfig`], or the defaults when no path is given.
pub fn read_config(path: Option<&Path>) -> Result<ListConfig, String> {
    let config = match path {
        Some(path) => {
            let text = read_text(path)?;
            serde_json::from_str::<ListConfig>(&text)
                .map_err(|e| format!("Invalid config '{}': {}", path.display(), e))?
        }
        None => ListConfig::default(),
    };
    config.validate().map_err(|e| format!("Invalid config: {}", e))?;
    Ok(config)
}

pub fn read_text(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to encode '{}': {}", path.display(), e))?;
    fs::write(path, json).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))
}

/// File name of the static ruleset for batch `index`, numbered from 1.
pub fn batch_file_name(index: usize) -> String {
    format!("rules_{}.json", index + 1)
}

/// Write one static ruleset file per batch into `dir`.
pub fn write_batches(dir: &Path, batches: &[RuleBatch]) -> Result<Vec<PathBuf>, String> {
    batches
        .iter()
        .map(|batch| {
            let path = dir.join(batch_file_name(batch.index));
            write_json(&path, &batch.rules)?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_compiler::build_batches;

    #[test]
    fn test_batch_files_are_numbered_from_one() {
        let dir = tempfile::tempdir().unwrap();
        let patterns: Vec<String> = (0..5).map(|i| format!("d{i}.com/*")).collect();
        let config = ListConfig { chunk_size: 2, ..ListConfig::default() };

        let paths = write_batches(dir.path(), &build_batches(&patterns, &config)).unwrap();
        let names: Vec<_> = paths.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["rules_1.json", "rules_2.json", "rules_3.json"]);

        let last: serde_json::Value = serde_json::from_str(&read_text(&paths[2]).unwrap()).unwrap();
        assert_eq!(last[0]["id"], 5);
        assert_eq!(last[0]["condition"]["urlFilter"], "d4.com/*");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"chunkSize": 500, "action": {"type": "block"}}"#).unwrap();

        let config = read_config(Some(&path)).unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.action, tc_core::RuleAction::Block);
        assert_eq!(config.max_age_ms, ListConfig::default().max_age_ms);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"chunkSize": 0}"#).unwrap();
        assert!(read_config(Some(&path)).unwrap_err().contains("chunkSize"));
    }
}
