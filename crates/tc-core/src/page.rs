//! Plain-data model of a scanned document.
//!
//! The content context fills a [`PageSnapshot`] from the live DOM; detectors
//! only ever see this snapshot, which keeps them pure and testable off-browser.

use serde::{Deserialize, Serialize};

/// One key/value pair from `localStorage` or `sessionStorage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub key: String,
    pub value: String,
}

impl StorageEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Everything the detectors inspect about a document.
///
/// All URLs are absolute, as resolved by the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSnapshot {
    /// Effective document URL
    pub url: String,
    /// `a[href]` targets
    pub links: Vec<String>,
    /// `script[src]` sources
    pub script_sources: Vec<String>,
    /// `iframe[src]` sources
    pub iframe_sources: Vec<String>,
    /// `img[src]` sources
    pub image_sources: Vec<String>,
    /// Names of resource-timing entries (every fetched subresource)
    pub resource_entries: Vec<String>,
    /// Bodies of scripts without a `src`
    pub inline_scripts: Vec<String>,
    pub local_storage: Vec<StorageEntry>,
    pub session_storage: Vec<StorageEntry>,
    /// Raw `document.cookie` string
    pub cookies: String,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    /// URLs inspected by the URL-parameter and domain detectors:
    /// the page itself, links, scripts and frames.
    pub fn navigable_urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str())
            .chain(self.links.iter().map(String::as_str))
            .chain(self.script_sources.iter().map(String::as_str))
            .chain(self.iframe_sources.iter().map(String::as_str))
    }

    /// URLs of subresources the page requested or embeds.
    pub fn resource_urls(&self) -> impl Iterator<Item = &str> {
        self.script_sources
            .iter()
            .chain(&self.iframe_sources)
            .chain(&self.image_sources)
            .chain(&self.resource_entries)
            .map(String::as_str)
    }

    /// Sources of elements that can load a third-party library.
    pub fn embedded_sources(&self) -> impl Iterator<Item = &str> {
        self.script_sources
            .iter()
            .chain(&self.iframe_sources)
            .map(String::as_str)
    }

    /// Cookies as `(name, value)` pairs.
    pub fn cookie_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies
            .split(';')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((name, value)) => (name.trim(), value.trim()),
                None => (pair, ""),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_pairs() {
        let mut page = PageSnapshot::new("https://example.com/");
        page.cookies = "_ga=GA1.2.3; theme=dark;; flag".to_string();
        let pairs: Vec<_> = page.cookie_pairs().collect();
        assert_eq!(pairs, vec![("_ga", "GA1.2.3"), ("theme", "dark"), ("flag", "")]);
    }

    #[test]
    fn test_navigable_urls_start_with_page() {
        let mut page = PageSnapshot::new("https://example.com/");
        page.links.push("https://example.com/a".to_string());
        page.image_sources.push("https://cdn.example.com/i.png".to_string());
        let urls: Vec<_> = page.navigable_urls().collect();
        assert_eq!(urls, vec!["https://example.com/", "https://example.com/a"]);
    }

    #[test]
    fn test_snapshot_json_defaults() {
        let page: PageSnapshot =
            serde_json::from_str(r#"{"url":"https://example.com/","scriptSources":["https://a.test/x.js"]}"#)
                .unwrap();
        assert_eq!(page.script_sources.len(), 1);
        assert!(page.links.is_empty());
        assert!(page.cookies.is_empty());
    }
}
