//! Storage-based tracking detector.

use crate::page::{PageSnapshot, StorageEntry};
use crate::tables::{contains_any, TRACKING_DOMAINS};

/// Counts web-storage entries and cookies whose key or content mentions a
/// tracking domain.
pub fn count_storage_trackers(page: &PageSnapshot) -> u32 {
    let storage = page
        .local_storage
        .iter()
        .chain(&page.session_storage)
        .filter(|entry| entry_matches(entry))
        .count();
    let cookies = page
        .cookie_pairs()
        .filter(|(name, value)| contains_any(name, TRACKING_DOMAINS) || contains_any(value, TRACKING_DOMAINS))
        .count();
    u32::try_from(storage + cookies).unwrap_or(u32::MAX)
}

fn entry_matches(entry: &StorageEntry) -> bool {
    contains_any(&entry.key, TRACKING_DOMAINS) || contains_any(&entry.value, TRACKING_DOMAINS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_local_session_and_cookies() {
        let mut page = PageSnapshot::new("https://news.example.com/");
        page.local_storage = vec![
            StorageEntry::new("hotjar.com:session", "1"),
            StorageEntry::new("theme", "dark"),
        ];
        page.session_storage = vec![StorageEntry::new("src", "https://stats.Doubleclick.net/p")];
        page.cookies = "a=1; ref=https%3A%2F%2Fwww.google-analytics.com; mixpanel.com_token=x".to_string();
        assert_eq!(count_storage_trackers(&page), 4);
    }

    #[test]
    fn test_clean_page_counts_zero() {
        let mut page = PageSnapshot::new("https://example.com/");
        page.local_storage = vec![StorageEntry::new("cart", "[]")];
        page.cookies = "session=abc".to_string();
        assert_eq!(count_storage_trackers(&page), 0);
    }
}
