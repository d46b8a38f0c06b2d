//! Messages exchanged with the background context.
//!
//! Two message kinds arrive at the background: count reports from content
//! scans (`{type:"TRACKER_COUNT", counts}`) and count queries from the popup
//! (`{action:"getCounts"}`). Anything else is rejected at the boundary.

use serde::{Deserialize, Serialize};

use crate::types::TrackerCountVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountTag {
    #[serde(rename = "TRACKER_COUNT")]
    TrackerCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryAction {
    #[serde(rename = "getCounts")]
    GetCounts,
}

/// Count report from a content scan.
///
/// Older content scripts send `count: <int>`; the alias plus the lenient
/// vector decoding accept that shape too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerCountMessage {
    #[serde(rename = "type")]
    pub tag: CountTag,
    #[serde(alias = "count")]
    pub counts: TrackerCountVector,
}

/// Count query from the display layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetCountsQuery {
    pub action: QueryAction,
}

/// Any message the background accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    TrackerCount(TrackerCountMessage),
    GetCounts(GetCountsQuery),
}

impl Message {
    pub fn tracker_count(counts: TrackerCountVector) -> Self {
        Self::TrackerCount(TrackerCountMessage { tag: CountTag::TrackerCount, counts })
    }

    pub fn get_counts() -> Self {
        Self::GetCounts(GetCountsQuery { action: QueryAction::GetCounts })
    }

    /// Decode and validate a raw message.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Acknowledgement of a count report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()) }
    }
}

/// Reply to a [`GetCountsQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountsResponse {
    pub counts: TrackerCountVector,
}

/// Any reply the background sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Counts(CountsResponse),
    Ack(Ack),
}
