//! Tracker Counter Block-List Compiler
//!
//! Turns an Adblock Plus style block list into batches of declarative rules
//! and keeps them refreshed on a daily cadence.
//!
//! Pipeline: `extract` (parser) → `optimize` (optimizer) → `chunk` and
//! `build` (builder) → `install` (refresh). The refresher persists the
//! optimized patterns in a [`FetchCacheRecord`] and falls back to it whenever
//! a refresh fails.

pub mod builder;
pub mod cache;
pub mod config;
pub mod optimizer;
pub mod parser;
pub mod refresh;

pub use builder::{build_batches, compile_list, CompiledList, RuleBatch, RuleEntry, RuleUpdate};
pub use cache::FetchCacheRecord;
pub use config::{ConfigError, ListConfig};
pub use optimizer::{optimize_patterns, OptimizeStats};
pub use parser::extract_patterns;
pub use refresh::{ListRefresher, ListSource, RefreshError, RefreshOutcome, RuleEngine};
