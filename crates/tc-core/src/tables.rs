//! Fixed match tables used by the detectors.
//!
//! Every entry is matched as a lowercase substring.

/// Tokens that mark a query-parameter key or path as tracking.
pub const URL_TRACKERS: &[&str] = &[
    "utm_",
    "gclid",
    "fbclid",
    "msclkid",
    "ref=",
    "tag=",
    "campaign",
    "source",
    "medium",
    "term",
    "content",
    "clickid",
    "affiliate",
    "partner",
    "tracking",
    "redirect",
    "adgrpid",
    "hvadid",
    "hvpos",
    "hvnetw",
    "hvrand",
    "hvqmt",
    "hvtargid",
    "hydadcr",
];

/// Hostname fragments of known tracking services.
pub const TRACKING_DOMAINS: &[&str] = &[
    "doubleclick.net",
    "google-analytics.com",
    "googletagmanager.com",
    "googlesyndication.com",
    "googleadservices.com",
    "facebook.net",
    "connect.facebook.com",
    "analytics.twitter.com",
    "ads-twitter.com",
    "bat.bing.com",
    "scorecardresearch.com",
    "quantserve.com",
    "adnxs.com",
    "criteo.com",
    "criteo.net",
    "taboola.com",
    "outbrain.com",
    "hotjar.com",
    "mixpanel.com",
    "segment.io",
    "amplitude.com",
    "analytics.tiktok.com",
    "chartbeat.com",
    "newrelic.com",
    "clarity.ms",
];

/// Interaction events that behavioral trackers listen for.
pub const INTERACTION_EVENTS: &[&str] = &["mousemove", "scroll", "click", "keypress"];

/// Calls that register an event listener.
pub const EVENT_REGISTRATION_CALLS: &[&str] = &["addeventlistener", "attachevent", ".on("];

/// Session-replay and behavioral analytics library names.
pub const TRACKING_LIBRARIES: &[&str] = &[
    "hotjar",
    "fullstory",
    "mouseflow",
    "crazyegg",
    "clarity",
    "smartlook",
    "logrocket",
    "inspectlet",
    "luckyorange",
    "heap-",
    "quantummetric",
    "sessioncam",
];

/// Returns the first table entry contained in `haystack`.
///
/// `haystack` must already be lowercased.
pub fn first_match<'t>(haystack: &str, table: &[&'t str]) -> Option<&'t str> {
    table.iter().copied().find(|token| haystack.contains(token))
}

/// Lowercases `haystack` and reports whether any table entry occurs in it.
pub fn contains_any(haystack: &str, table: &[&str]) -> bool {
    first_match(&haystack.to_ascii_lowercase(), table).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_lowercase() {
        for table in [URL_TRACKERS, TRACKING_DOMAINS, TRACKING_LIBRARIES, EVENT_REGISTRATION_CALLS] {
            for entry in table {
                assert_eq!(*entry, entry.to_ascii_lowercase());
            }
        }
    }

    #[test]
    fn test_contains_any() {
        assert!(contains_any("https://WWW.Google-Analytics.com/collect", TRACKING_DOMAINS));
        assert!(!contains_any("https://example.org/", TRACKING_DOMAINS));
        assert_eq!(first_match("x.hotjar.com", TRACKING_DOMAINS), Some("hotjar.com"));
    }
}
