//! Page scanner: runs every detector once per scan and reports the result.
//!
//! A scan happens when the document becomes ready and again whenever the
//! effective URL changes without a full navigation (single-page-app routing).
//! Reports are best-effort; a lost report is superseded by the next scan.

use crate::detect::{
    count_behavioral_trackers, count_network_trackers, count_storage_trackers, count_tracking_urls,
    detect_canvas_fingerprint, detect_webgl_fingerprint, SurfaceFactory,
};
use crate::message::{Ack, Message};
use crate::page::PageSnapshot;
use crate::types::TrackerCountVector;

/// Run every detector exactly once against `page`.
pub fn scan_page<F: SurfaceFactory + ?Sized>(page: &PageSnapshot, surfaces: &F) -> TrackerCountVector {
    TrackerCountVector {
        url: count_tracking_urls(page.navigable_urls()),
        network: count_network_trackers(page.resource_urls()),
        canvas: u32::from(detect_canvas_fingerprint(surfaces)),
        webgl: u32::from(detect_webgl_fingerprint(surfaces)),
        storage: count_storage_trackers(page),
        behavioral: count_behavioral_trackers(page),
    }
}

/// Per-document scanner state.
#[derive(Debug, Default)]
pub struct PageScanner {
    last_url: Option<String>,
    scans: u64,
}

impl PageScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `page` and remember its URL as the last one seen.
    pub fn scan<F: SurfaceFactory + ?Sized>(&mut self, page: &PageSnapshot, surfaces: &F) -> TrackerCountVector {
        let counts = scan_page(page, surfaces);
        self.last_url = Some(page.url.clone());
        self.scans += 1;
        log::debug!("Scan #{} of {}: {} trackers", self.scans, page.url, counts.total());
        counts
    }

    /// Record `current_url`; returns true when it differs from the last one
    /// seen and a rescan is due.
    pub fn observe_url(&mut self, current_url: &str) -> bool {
        if self.last_url.as_deref() == Some(current_url) {
            return false;
        }
        self.last_url = Some(current_url.to_string());
        true
    }

    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    pub fn scan_count(&self) -> u64 {
        self.scans
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// No background context is listening (extension reloaded or disabled).
    #[error("Receiving end does not exist")]
    ReceiverUnavailable,
    #[error("Message delivery failed: {0}")]
    Delivery(String),
}

/// Sends messages to the background context.
#[allow(async_fn_in_trait)]
pub trait CountReporter {
    async fn send(&self, message: &Message) -> Result<Ack, ReportError>;
}

/// Report a scan result. Failures are logged and swallowed; returns whether
/// the background acknowledged the counts.
pub async fn report_counts<R: CountReporter + ?Sized>(reporter: &R, counts: TrackerCountVector) -> bool {
    match reporter.send(&Message::tracker_count(counts)).await {
        Ok(ack) if ack.success => true,
        Ok(ack) => {
            log::warn!(
                "Background rejected tracker counts: {}",
                ack.error.as_deref().unwrap_or("no reason given")
            );
            false
        }
        Err(ReportError::ReceiverUnavailable) => {
            log::warn!("Background unavailable, tracker counts not delivered");
            false
        }
        Err(e) => {
            log::debug!("Tracker count report dropped, next scan will retry: {e}");
            false
        }
    }
}
