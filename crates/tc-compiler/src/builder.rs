//! Declarative rule construction.
//!
//! Optimized patterns are split into batches no larger than the rule engine's
//! ceiling. Rule ids are global and deterministic: the rule at `offset` in
//! batch `index` gets `index * chunk_size + offset + 1`, so ids are exactly
//! `1..=n` for `n` patterns and re-installing a list replaces rules in place.

use serde::{Deserialize, Serialize};
use tc_core::{ResourceType, RuleAction};

use crate::config::ListConfig;
use crate::optimizer::{optimize_patterns, OptimizeStats};
use crate::parser::extract_patterns;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: ResourceType,
}

/// One declarative rule, serialized in the rule engine's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

/// A bounded group of rules installed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBatch {
    pub index: usize,
    pub rules: Vec<RuleEntry>,
}

impl RuleBatch {
    pub fn ids(&self) -> Vec<u32> {
        self.rules.iter().map(|rule| rule.id).collect()
    }

    /// Update that replaces this batch's ids, plus any `stale` ids.
    pub fn to_update(&self, stale: &[u32]) -> RuleUpdate {
        let mut remove_rule_ids = self.ids();
        remove_rule_ids.extend_from_slice(stale);
        RuleUpdate {
            remove_rule_ids,
            add_rules: self.rules.clone(),
        }
    }
}

/// A single `{removeRuleIds, addRules}` call to the rule engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdate {
    pub remove_rule_ids: Vec<u32>,
    pub add_rules: Vec<RuleEntry>,
}

/// Rule id of the pattern at `offset` in batch `index`.
pub fn rule_id(index: usize, chunk_size: usize, offset: usize) -> u32 {
    let id = index
        .saturating_mul(chunk_size)
        .saturating_add(offset)
        .saturating_add(1);
    u32::try_from(id).unwrap_or(u32::MAX)
}

/// Split patterns into batches of at most `config.chunk_size` rules.
pub fn build_batches(patterns: &[String], config: &ListConfig) -> Vec<RuleBatch> {
    let chunk_size = config.chunk_size.max(1);
    patterns
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, chunk)| RuleBatch {
            index,
            rules: chunk
                .iter()
                .enumerate()
                .map(|(offset, pattern)| RuleEntry {
                    id: rule_id(index, chunk_size, offset),
                    priority: config.priority,
                    action: config.action,
                    condition: RuleCondition {
                        url_filter: pattern.clone(),
                        resource_types: config.resource_types,
                    },
                })
                .collect(),
        })
        .collect()
}

/// Result of running the whole pipeline over a list document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledList {
    /// Raw patterns extracted before optimization
    pub raw: usize,
    pub stats: OptimizeStats,
    pub patterns: Vec<String>,
    pub batches: Vec<RuleBatch>,
}

/// Extract, optimize and chunk a block-list document.
pub fn compile_list(text: &str, config: &ListConfig) -> CompiledList {
    let mut patterns = extract_patterns(text);
    let raw = patterns.len();
    log::info!("Found {raw} raw rules");

    let stats = optimize_patterns(&mut patterns);
    log::info!("Optimized to {} rules ({} wildcarded domains)", stats.after, stats.wildcarded);

    let batches = build_batches(&patterns, config);
    log::info!("Split into {} chunks", batches.len());

    CompiledList {
        raw,
        stats,
        patterns,
        batches,
    }
}
