//! Per-tab running totals.
//!
//! Only the current (foreground) tab accumulates. Navigation start or
//! activation of a tab resets its totals and makes it current; reports from
//! any other tab are discarded. Every mutation is written through to the
//! [`KeyValueStore`]; queries are answered from the in-memory copy, which
//! stays authoritative when a write fails.
//!
//! Handlers take `&mut self`, so one handler at a time mutates the aggregate.

use crate::message::{Ack, CountsResponse, Message, Response};
use crate::store::{encode, get_typed, KeyValueStore, StoreError, TRACKER_COUNT_KEY, TRACKER_TAB_KEY};
use crate::types::{TabId, TrackerCountVector};

/// Tab lifecycle notifications that reset the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabEvent {
    /// A tab started loading a new document.
    NavigationStarted(TabId),
    /// The user switched to a tab.
    Activated(TabId),
}

impl TabEvent {
    pub fn tab_id(self) -> TabId {
        match self {
            Self::NavigationStarted(id) | Self::Activated(id) => id,
        }
    }
}

pub struct TabAggregator<S> {
    store: S,
    current: Option<TabId>,
    counts: TrackerCountVector,
}

impl<S: KeyValueStore> TabAggregator<S> {
    /// Empty aggregator with no current tab.
    pub fn new(store: S) -> Self {
        Self { store, current: None, counts: TrackerCountVector::ZERO }
    }

    /// Rebuild state persisted by a previous background instance.
    pub fn restore(store: S) -> Self {
        let mut aggregator = Self::new(store);
        match get_typed::<TabId, _>(&aggregator.store, TRACKER_TAB_KEY) {
            Ok(tab) => aggregator.current = tab,
            Err(e) => log::warn!("Could not restore current tab: {e}"),
        }
        if aggregator.current.is_some() {
            match get_typed::<TrackerCountVector, _>(&aggregator.store, TRACKER_COUNT_KEY) {
                Ok(counts) => aggregator.counts = counts.unwrap_or_default(),
                Err(e) => log::warn!("Could not restore tracker counts: {e}"),
            }
        }
        aggregator
    }

    pub fn handle_event(&mut self, event: TabEvent) {
        log::debug!("Tab event {event:?}, resetting tracker counts");
        self.reset(event.tab_id());
    }

    /// Zero the aggregate and make `tab` current.
    pub fn reset(&mut self, tab: TabId) {
        self.current = Some(tab);
        self.counts = TrackerCountVector::ZERO;
        self.persist();
    }

    /// Fold a scan result into the aggregate if it comes from the current tab.
    ///
    /// Before any tab event has been seen, the first reporting tab becomes
    /// current.
    pub fn record(&mut self, tab: Option<TabId>, counts: &TrackerCountVector) -> Ack {
        let Some(tab) = tab else {
            return Ack::failed("sender is not a tab");
        };
        match self.current {
            Some(current) if current != tab => {
                log::debug!("Ignoring counts from background tab {tab}");
                return Ack::ok();
            }
            Some(_) => {}
            None => self.current = Some(tab),
        }
        self.counts.merge(counts);
        self.persist();
        log::debug!("Tab {tab} now at {} trackers", self.counts.total());
        Ack::ok()
    }

    /// Aggregate of the current tab.
    ///
    /// Served from memory: every mutation writes through, so the store never
    /// holds anything newer, and after a failed write it holds something older.
    pub fn current_counts(&self) -> TrackerCountVector {
        self.counts
    }

    pub fn current_tab(&self) -> Option<TabId> {
        self.current
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Dispatch a validated message from `sender_tab`.
    pub fn handle_message(&mut self, message: Message, sender_tab: Option<TabId>) -> Response {
        match message {
            Message::TrackerCount(report) => Response::Ack(self.record(sender_tab, &report.counts)),
            Message::GetCounts(_) => Response::Counts(CountsResponse { counts: self.current_counts() }),
        }
    }

    fn persist(&self) {
        if let Err(e) = self.write_through() {
            log::warn!("Persisting tracker counts failed, keeping in-memory copy: {e}");
        }
    }

    fn write_through(&self) -> Result<(), StoreError> {
        let counts = encode(TRACKER_COUNT_KEY, &self.counts)?;
        let tab = encode(TRACKER_TAB_KEY, &self.current)?;
        self.store.set_many(vec![(TRACKER_COUNT_KEY, counts), (TRACKER_TAB_KEY, tab)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn vector(url: u32, canvas: u32, storage: u32) -> TrackerCountVector {
        TrackerCountVector { url, canvas, storage, ..TrackerCountVector::ZERO }
    }

    #[test]
    fn test_sum_of_sequential_scans() {
        let mut agg = TabAggregator::new(MemoryStore::new());
        agg.handle_event(TabEvent::Activated(7));
        let reports = [vector(1, 0, 2), vector(0, 1, 0), vector(4, 1, 3)];
        for report in &reports {
            assert_eq!(agg.record(Some(7), report), Ack::ok());
        }
        assert_eq!(agg.current_counts(), vector(5, 2, 5));
    }

    #[test]
    fn test_reset_on_navigation_and_activation() {
        let mut agg = TabAggregator::new(MemoryStore::new());
        agg.handle_event(TabEvent::Activated(1));
        agg.record(Some(1), &vector(3, 1, 1));

        agg.handle_event(TabEvent::NavigationStarted(1));
        assert!(agg.current_counts().is_zero());

        agg.record(Some(1), &vector(2, 0, 0));
        agg.handle_event(TabEvent::Activated(2));
        assert!(agg.current_counts().is_zero());
        assert_eq!(agg.current_tab(), Some(2));
    }

    #[test]
    fn test_background_tab_reports_are_discarded() {
        let mut agg = TabAggregator::new(MemoryStore::new());
        agg.handle_event(TabEvent::Activated(1));
        agg.record(Some(1), &vector(1, 0, 0));
        assert_eq!(agg.record(Some(9), &vector(50, 0, 0)), Ack::ok());
        assert_eq!(agg.current_counts(), vector(1, 0, 0));
        assert!(!agg.record(None, &vector(1, 0, 0)).success);
    }

    #[test]
    fn test_first_report_adopts_tab() {
        let mut agg = TabAggregator::new(MemoryStore::new());
        agg.record(Some(4), &vector(1, 0, 0));
        assert_eq!(agg.current_tab(), Some(4));
        agg.record(Some(5), &vector(1, 0, 0));
        assert_eq!(agg.current_counts(), vector(1, 0, 0));
    }

    #[test]
    fn test_unreachable_store_falls_back_to_memory() {
        let store = MemoryStore::new();
        let mut agg = TabAggregator::new(&store);
        agg.handle_event(TabEvent::Activated(1));
        agg.record(Some(1), &vector(1, 0, 0));

        store.set_unavailable(true);
        agg.record(Some(1), &vector(1, 0, 0));
        assert_eq!(agg.current_counts(), vector(2, 0, 0));
    }

    #[test]
    fn test_failed_reset_write_is_not_masked_by_recovered_store() {
        let store = MemoryStore::new();
        let mut agg = TabAggregator::new(&store);
        agg.handle_event(TabEvent::Activated(1));
        agg.record(Some(1), &vector(5, 0, 0));

        store.set_unavailable(true);
        agg.handle_event(TabEvent::Activated(2));
        store.set_unavailable(false);

        assert_eq!(agg.current_tab(), Some(2));
        assert!(agg.current_counts().is_zero());
    }

    #[test]
    fn test_restore_from_store() {
        let store = MemoryStore::new();
        {
            let mut agg = TabAggregator::new(&store);
            agg.handle_event(TabEvent::Activated(3));
            agg.record(Some(3), &vector(2, 1, 0));
        }
        let mut restored = TabAggregator::restore(&store);
        assert_eq!(restored.current_tab(), Some(3));
        restored.record(Some(3), &vector(1, 0, 0));
        assert_eq!(restored.current_counts(), vector(3, 1, 0));
    }

    #[test]
    fn test_restore_legacy_integer() {
        let store = MemoryStore::new();
        store.set(TRACKER_TAB_KEY, serde_json::json!(2)).unwrap();
        store.set(TRACKER_COUNT_KEY, serde_json::json!(6)).unwrap();
        let agg = TabAggregator::restore(&store);
        assert_eq!(agg.current_counts(), vector(6, 0, 0));
    }

    #[test]
    fn test_handle_message_dispatch() {
        let mut agg = TabAggregator::new(MemoryStore::new());
        agg.handle_event(TabEvent::Activated(1));
        let ack = agg.handle_message(Message::tracker_count(vector(0, 1, 0)), Some(1));
        assert_eq!(ack, Response::Ack(Ack::ok()));
        let reply = agg.handle_message(Message::get_counts(), None);
        assert_eq!(reply, Response::Counts(CountsResponse { counts: vector(0, 1, 0) }));
    }
}
