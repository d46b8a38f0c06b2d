//! URL-parameter and domain detectors.

use std::collections::HashSet;

use crate::tables::{first_match, TRACKING_DOMAINS, URL_TRACKERS};
use crate::url::{self, Url};

/// True if any query key or the path contains a tracker token.
///
/// Matching is case-insensitive. Malformed URLs are not tracking.
pub fn has_tracking_params(input: &str) -> bool {
    match url::parse(input) {
        Ok(parsed) => params_match(&parsed),
        Err(e) => {
            log::debug!("URL-parameter detector skipped input: {e}");
            false
        }
    }
}

/// True if the hostname contains a known tracking-service domain.
pub fn has_tracking_domain(input: &str) -> bool {
    match url::parse(input) {
        Ok(parsed) => domain_match(&parsed),
        Err(e) => {
            log::debug!("Domain detector skipped input: {e}");
            false
        }
    }
}

/// True if either the parameter or the domain detector flags the URL.
pub fn is_tracking_url(input: &str) -> bool {
    match url::parse(input) {
        Ok(parsed) => params_match(&parsed) || domain_match(&parsed),
        Err(e) => {
            log::debug!("Skipping malformed URL: {e}");
            false
        }
    }
}

/// Number of URLs flagged by [`is_tracking_url`].
pub fn count_tracking_urls<'a>(urls: impl IntoIterator<Item = &'a str>) -> u32 {
    let flagged = urls.into_iter().filter(|u| is_tracking_url(u)).count();
    u32::try_from(flagged).unwrap_or(u32::MAX)
}

/// Number of distinct resource URLs served from a tracking domain.
pub fn count_network_trackers<'a>(urls: impl IntoIterator<Item = &'a str>) -> u32 {
    let distinct: HashSet<&str> = urls
        .into_iter()
        .filter(|u| has_tracking_domain(u))
        .collect();
    u32::try_from(distinct.len()).unwrap_or(u32::MAX)
}

fn params_match(parsed: &Url) -> bool {
    let key_hit = url::query_keys(parsed)
        .any(|key| first_match(&key.to_ascii_lowercase(), URL_TRACKERS).is_some());
    key_hit || first_match(&url::path_lower(parsed), URL_TRACKERS).is_some()
}

fn domain_match(parsed: &Url) -> bool {
    url::host(parsed)
        .map(|host| first_match(&host, TRACKING_DOMAINS).is_some())
        .unwrap_or(false)
}
