//! Tracker Counter Core Library
//!
//! Heuristic detection of privacy-invasive tracking techniques and the
//! per-tab bookkeeping that turns individual page scans into the counts shown
//! to the user.
//!
//! # Architecture
//!
//! A content context builds a [`PageSnapshot`] of the document it runs in and
//! hands it to a [`PageScanner`], which runs every detector exactly once and
//! produces a [`TrackerCountVector`]. The vector travels to the background
//! context as a [`Message`], where the [`TabAggregator`] folds it into the
//! running total of the current tab.
//!
//! # Modules
//!
//! - `tables`: fixed tracker token and domain tables
//! - `url`: URL parsing helpers shared by the detectors
//! - `detect`: the individual detectors, one per tracker category
//! - `page`: plain-data model of a scanned document
//! - `scanner`: detector orchestration and best-effort reporting
//! - `message`: content/popup to background message types
//! - `store`: key/value persistence seam
//! - `aggregator`: per-tab running totals
//! - `types`: shared type definitions

pub mod aggregator;
pub mod detect;
pub mod message;
pub mod page;
pub mod scanner;
pub mod store;
pub mod tables;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use aggregator::{TabAggregator, TabEvent};
pub use message::{Ack, CountsResponse, Message, Response};
pub use page::PageSnapshot;
pub use scanner::{CountReporter, PageScanner, ReportError};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use types::{ResourceType, RuleAction, TabId, TrackerCategory, TrackerCountVector};
