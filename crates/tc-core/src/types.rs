//! Core type definitions for Tracker Counter
//!
//! These types cross every boundary in the system: content scans produce
//! them, messages carry them, storage persists them and the declarative
//! rule engine consumes the rule-side ones.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Browser tab identifier.
pub type TabId = i32;

// =============================================================================
// Tracker Categories
// =============================================================================

/// Classification bucket for a detected tracking technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerCategory {
    /// Tracking parameters or tracker hosts in page/link/resource URLs
    Url,
    /// Requests made to known tracking services
    Network,
    /// Canvas pixel read-back
    Canvas,
    /// WebGL parameter queries
    Webgl,
    /// Tracking identifiers in cookies and web storage
    Storage,
    /// Interaction listeners and session-replay libraries
    Behavioral,
}

impl TrackerCategory {
    /// All categories, in display order.
    pub const ALL: [TrackerCategory; 6] = [
        Self::Url,
        Self::Network,
        Self::Canvas,
        Self::Webgl,
        Self::Storage,
        Self::Behavioral,
    ];

    /// Key used for this category in persisted and messaged vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Network => "network",
            Self::Canvas => "canvas",
            Self::Webgl => "webgl",
            Self::Storage => "storage",
            Self::Behavioral => "behavioral",
        }
    }
}

impl fmt::Display for TrackerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tracker Count Vector
// =============================================================================

/// Per-category tracker counts.
///
/// Serializes as `{"url":0,"network":0,...}`. Deserialization is lenient:
/// missing categories read as zero and a bare integer (the single counter
/// written by older builds) is attributed to [`TrackerCategory::Url`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredCounts")]
pub struct TrackerCountVector {
    pub url: u32,
    pub network: u32,
    pub canvas: u32,
    pub webgl: u32,
    pub storage: u32,
    pub behavioral: u32,
}

impl TrackerCountVector {
    /// The all-zero vector.
    pub const ZERO: TrackerCountVector = TrackerCountVector {
        url: 0,
        network: 0,
        canvas: 0,
        webgl: 0,
        storage: 0,
        behavioral: 0,
    };

    pub fn get(&self, category: TrackerCategory) -> u32 {
        match category {
            TrackerCategory::Url => self.url,
            TrackerCategory::Network => self.network,
            TrackerCategory::Canvas => self.canvas,
            TrackerCategory::Webgl => self.webgl,
            TrackerCategory::Storage => self.storage,
            TrackerCategory::Behavioral => self.behavioral,
        }
    }

    pub fn set(&mut self, category: TrackerCategory, count: u32) {
        let slot = match category {
            TrackerCategory::Url => &mut self.url,
            TrackerCategory::Network => &mut self.network,
            TrackerCategory::Canvas => &mut self.canvas,
            TrackerCategory::Webgl => &mut self.webgl,
            TrackerCategory::Storage => &mut self.storage,
            TrackerCategory::Behavioral => &mut self.behavioral,
        };
        *slot = count;
    }

    /// Elementwise saturating sum.
    pub fn merge(&mut self, other: &TrackerCountVector) {
        for category in TrackerCategory::ALL {
            let sum = self.get(category).saturating_add(other.get(category));
            self.set(category, sum);
        }
    }

    /// Sum over all categories.
    pub fn total(&self) -> u64 {
        self.iter().map(|(_, count)| u64::from(count)).sum()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Iterate `(category, count)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (TrackerCategory, u32)> + '_ {
        TrackerCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCounts {
    Legacy(u32),
    Categories(CategoryCounts),
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct CategoryCounts {
    url: u32,
    network: u32,
    canvas: u32,
    webgl: u32,
    storage: u32,
    behavioral: u32,
}

impl From<StoredCounts> for TrackerCountVector {
    fn from(stored: StoredCounts) -> Self {
        match stored {
            StoredCounts::Legacy(count) => Self {
                url: count,
                ..Self::ZERO
            },
            StoredCounts::Categories(c) => Self {
                url: c.url,
                network: c.network,
                canvas: c.canvas,
                webgl: c.webgl,
                storage: c.storage,
                behavioral: c.behavioral,
            },
        }
    }
}

// =============================================================================
// Rule Actions
// =============================================================================

/// Action attached to an installed declarative rule.
///
/// Serializes as the rule engine expects: `{"type":"allow"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleAction {
    #[default]
    Allow,
    Block,
}

// =============================================================================
// Resource Types (bit mask for rule conditions)
// =============================================================================

bitflags::bitflags! {
    /// Resource type bit mask for rule conditions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceType: u32 {
        const MAIN_FRAME = 1 << 0;
        const SUB_FRAME = 1 << 1;
        const STYLESHEET = 1 << 2;
        const SCRIPT = 1 << 3;
        const IMAGE = 1 << 4;
        const FONT = 1 << 5;
        const OBJECT = 1 << 6;
        const XMLHTTPREQUEST = 1 << 7;
        const PING = 1 << 8;
        const CSP_REPORT = 1 << 9;
        const MEDIA = 1 << 10;
        const WEBSOCKET = 1 << 11;
        const OTHER = 1 << 12;

        /// Types covered by installed tracker-list rules
        const TRACKER_DEFAULT = Self::SCRIPT.bits() | Self::IMAGE.bits() | Self::XMLHTTPREQUEST.bits();
    }
}

const RESOURCE_TYPE_NAMES: [(ResourceType, &str); 13] = [
    (ResourceType::MAIN_FRAME, "main_frame"),
    (ResourceType::SUB_FRAME, "sub_frame"),
    (ResourceType::STYLESHEET, "stylesheet"),
    (ResourceType::SCRIPT, "script"),
    (ResourceType::IMAGE, "image"),
    (ResourceType::FONT, "font"),
    (ResourceType::OBJECT, "object"),
    (ResourceType::XMLHTTPREQUEST, "xmlhttprequest"),
    (ResourceType::PING, "ping"),
    (ResourceType::CSP_REPORT, "csp_report"),
    (ResourceType::MEDIA, "media"),
    (ResourceType::WEBSOCKET, "websocket"),
    (ResourceType::OTHER, "other"),
];

impl ResourceType {
    /// Parse a single rule-engine resource type name.
    pub fn from_rule_name(name: &str) -> Option<Self> {
        RESOURCE_TYPE_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(ty, _)| *ty)
    }

    /// Names of the set bits, in rule-engine order.
    pub fn names(self) -> Vec<&'static str> {
        RESOURCE_TYPE_NAMES
            .iter()
            .filter(|(ty, _)| self.contains(*ty))
            .map(|(_, n)| *n)
            .collect()
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names = self.names();
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NamesVisitor;

        impl<'de> Visitor<'de> for NamesVisitor {
            type Value = ResourceType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of resource type names")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut mask = ResourceType::empty();
                while let Some(name) = seq.next_element::<String>()? {
                    let ty = ResourceType::from_rule_name(&name).ok_or_else(|| {
                        de::Error::custom(format!("unknown resource type: {name}"))
                    })?;
                    mask |= ty;
                }
                Ok(mask)
            }
        }

        deserializer.deserialize_seq(NamesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_elementwise() {
        let mut total = TrackerCountVector { url: 1, canvas: 1, ..TrackerCountVector::ZERO };
        total.merge(&TrackerCountVector { url: 2, storage: 4, ..TrackerCountVector::ZERO });
        assert_eq!(total.url, 3);
        assert_eq!(total.canvas, 1);
        assert_eq!(total.storage, 4);
        assert_eq!(total.total(), 8);
    }

    #[test]
    fn test_merge_saturates() {
        let mut total = TrackerCountVector { webgl: u32::MAX, ..TrackerCountVector::ZERO };
        total.merge(&TrackerCountVector { webgl: 5, ..TrackerCountVector::ZERO });
        assert_eq!(total.webgl, u32::MAX);
    }

    #[test]
    fn test_counts_json_shape() {
        let counts = TrackerCountVector { network: 2, behavioral: 1, ..TrackerCountVector::ZERO };
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": 0, "network": 2, "canvas": 0,
                "webgl": 0, "storage": 0, "behavioral": 1
            })
        );
    }

    #[test]
    fn test_counts_lenient_decode() {
        let partial: TrackerCountVector = serde_json::from_str(r#"{"canvas":1}"#).unwrap();
        assert_eq!(partial, TrackerCountVector { canvas: 1, ..TrackerCountVector::ZERO });

        let legacy: TrackerCountVector = serde_json::from_str("7").unwrap();
        assert_eq!(legacy, TrackerCountVector { url: 7, ..TrackerCountVector::ZERO });
    }

    #[test]
    fn test_rule_action_shape() {
        assert_eq!(serde_json::to_string(&RuleAction::Allow).unwrap(), r#"{"type":"allow"}"#);
        assert_eq!(serde_json::to_string(&RuleAction::Block).unwrap(), r#"{"type":"block"}"#);
    }

    #[test]
    fn test_resource_type_names() {
        let json = serde_json::to_string(&ResourceType::TRACKER_DEFAULT).unwrap();
        assert_eq!(json, r#"["script","image","xmlhttprequest"]"#);

        let parsed: ResourceType = serde_json::from_str(r#"["image","script"]"#).unwrap();
        assert_eq!(parsed, ResourceType::SCRIPT | ResourceType::IMAGE);
        assert!(serde_json::from_str::<ResourceType>(r#"["bogus"]"#).is_err());
    }

    #[test]
    fn test_rule_name_lookup() {
        assert_eq!(ResourceType::from_rule_name("xmlhttprequest"), Some(ResourceType::XMLHTTPREQUEST));
        assert_eq!(ResourceType::from_rule_name("Script"), None);
    }
}
