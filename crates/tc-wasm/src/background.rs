//! Background service worker: tab aggregation and block-list refresh.
//!
//! State lives in a thread-local for the lifetime of the worker. Every
//! handler runs to completion on the single JS thread before the next one
//! starts, so the aggregate is never observed half-updated.

use std::cell::{Cell, RefCell};

use tc_compiler::{ListConfig, ListRefresher, ListSource, RefreshError, RefreshOutcome, RuleEngine, RuleUpdate};
use tc_core::{Ack, Message, Response, TabAggregator, TabEvent, TabId};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::chrome;
use crate::store::ChromeStore;

struct Background {
    aggregator: TabAggregator<ChromeStore>,
    store: ChromeStore,
    config: ListConfig,
    active_rules: usize,
}

thread_local! {
    static BACKGROUND: RefCell<Option<Background>> = const { RefCell::new(None) };
    static EARLY_EVENT: EarlyEvent = const { EarlyEvent::new() };
}

/// Tab event seen while `background_init` is still hydrating.
///
/// Every event resets the aggregate and picks the current tab, so only the
/// latest one has to survive until the aggregator exists.
struct EarlyEvent(Cell<Option<TabEvent>>);

impl EarlyEvent {
    const fn new() -> Self {
        Self(Cell::new(None))
    }

    fn hold(&self, event: TabEvent) {
        if let Some(replaced) = self.0.replace(Some(event)) {
            log::debug!("Superseding early {replaced:?} with {event:?}");
        }
    }

    /// Apply the held event, if any, to a freshly restored aggregator.
    fn replay<S: tc_core::KeyValueStore>(&self, aggregator: &mut TabAggregator<S>) {
        if let Some(event) = self.0.take() {
            log::debug!("Replaying {event:?} received during startup");
            aggregator.handle_event(event);
        }
    }
}

fn with_background<R>(f: impl FnOnce(&mut Background) -> R) -> Option<R> {
    BACKGROUND.with(|cell| cell.borrow_mut().as_mut().map(f))
}

/// Hydrate state from extension storage and start the first block-list
/// refresh. `config` is an optional partial [`ListConfig`] object.
#[wasm_bindgen]
pub async fn background_init(config: JsValue) -> Result<(), JsValue> {
    let config: ListConfig = if config.is_undefined() || config.is_null() {
        ListConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("Invalid config: {e}")))?
    };
    config.validate().map_err(|e| JsValue::from_str(&e.to_string()))?;

    let store = ChromeStore::hydrate().await;
    let mut aggregator = TabAggregator::restore(store.clone());
    EARLY_EVENT.with(|early| early.replay(&mut aggregator));
    log::info!("Background ready, current tab {:?}", aggregator.current_tab());

    BACKGROUND.with(|cell| {
        *cell.borrow_mut() = Some(Background {
            aggregator,
            store,
            config,
            active_rules: 0,
        });
    });

    spawn_local(async {
        refresh_block_list().await;
    });
    Ok(())
}

/// Forward of `chrome.tabs.onUpdated`. Only the `loading` transition counts
/// as a navigation start.
#[wasm_bindgen]
pub fn on_tab_updated(tab_id: i32, status: Option<String>) {
    if status.as_deref() != Some("loading") {
        return;
    }
    dispatch_event(TabEvent::NavigationStarted(tab_id));
}

/// Forward of `chrome.tabs.onActivated`.
#[wasm_bindgen]
pub fn on_tab_activated(tab_id: i32) {
    dispatch_event(TabEvent::Activated(tab_id));
}

fn dispatch_event(event: TabEvent) {
    if with_background(|bg| bg.aggregator.handle_event(event)).is_none() {
        EARLY_EVENT.with(|early| early.hold(event));
    }
}

/// Forward of `chrome.runtime.onMessage`. Returns the reply to send back.
#[wasm_bindgen]
pub fn handle_message(message: JsValue, sender_tab_id: Option<i32>) -> JsValue {
    let response = match serde_wasm_bindgen::from_value::<Message>(message) {
        Ok(message) => route_message(message, sender_tab_id),
        Err(e) => {
            log::debug!("Ignoring unrecognized message: {e}");
            Response::Ack(Ack::failed("unrecognized message"))
        }
    };
    chrome::to_js(&response).unwrap_or_else(|e| {
        log::error!("Could not serialize reply: {e}");
        JsValue::NULL
    })
}

fn route_message(message: Message, sender_tab: Option<TabId>) -> Response {
    with_background(|bg| bg.aggregator.handle_message(message, sender_tab))
        .unwrap_or_else(|| Response::Ack(Ack::failed("background not initialized")))
}

/// Run one block-list refresh cycle and resolve to the number of patterns
/// in effect afterwards.
#[wasm_bindgen]
pub async fn refresh_block_list() -> JsValue {
    let Some((store, config)) = with_background(|bg| (bg.store.clone(), bg.config.clone())) else {
        log::warn!("Block-list refresh requested before background_init");
        return JsValue::from_f64(0.0);
    };

    let refresher = ListRefresher::new(FetchSource, DnrEngine, store, config);
    let outcome = refresher.refresh(chrome::now_ms()).await;
    let rules = outcome.rules().len();
    match &outcome {
        RefreshOutcome::Installed { batches, .. } => log::info!("Installed {rules} rules in {batches} chunks"),
        RefreshOutcome::Cached { .. } | RefreshOutcome::FellBack { .. } => log::info!("{rules} cached rules in effect"),
        RefreshOutcome::Failed => log::warn!("No block-list rules available"),
    }
    with_background(|bg| bg.active_rules = rules);
    JsValue::from_f64(rules as f64)
}

/// Patterns in effect after the most recent refresh.
#[wasm_bindgen]
pub fn active_rule_count() -> u32 {
    with_background(|bg| u32::try_from(bg.active_rules).unwrap_or(u32::MAX)).unwrap_or(0)
}

/// `fetch` with an abort-signal timeout.
struct FetchSource;

impl ListSource for FetchSource {
    async fn fetch_list(&self, url: &str, timeout_ms: u64) -> Result<String, RefreshError> {
        let init = js_sys::Object::new();
        js_sys::Reflect::set(
            &init,
            &JsValue::from_str("signal"),
            &chrome::abort_signal_timeout(timeout_ms as f64),
        )
        .map_err(|e| RefreshError::Transport(chrome::error_message(&e)))?;

        let response = chrome::fetch_with_init(url, &init)
            .await
            .map_err(|e| RefreshError::Transport(chrome::error_message(&e)))?
            .dyn_into::<web_sys::Response>()
            .map_err(|_| RefreshError::Transport("fetch did not return a Response".into()))?;
        if !response.ok() {
            return Err(RefreshError::Status(response.status()));
        }

        let text = response.text().map_err(|e| RefreshError::Transport(chrome::error_message(&e)))?;
        wasm_bindgen_futures::JsFuture::from(text)
            .await
            .map_err(|e| RefreshError::Transport(chrome::error_message(&e)))?
            .as_string()
            .ok_or_else(|| RefreshError::Transport("response body is not text".into()))
    }
}

/// `chrome.declarativeNetRequest.updateDynamicRules`.
struct DnrEngine;

impl RuleEngine for DnrEngine {
    async fn update_rules(&self, update: RuleUpdate) -> Result<(), String> {
        let options = chrome::to_js(&update).map_err(|e| e.to_string())?;
        chrome::update_dynamic_rules(options)
            .await
            .map(|_| ())
            .map_err(|e| chrome::error_message(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_core::store::MemoryStore;
    use tc_core::TrackerCountVector;

    #[test]
    fn test_latest_early_event_is_replayed_once() {
        let early = EarlyEvent::new();
        early.hold(TabEvent::Activated(1));
        early.hold(TabEvent::NavigationStarted(3));

        let store = MemoryStore::new();
        let mut aggregator = TabAggregator::new(&store);
        aggregator.record(Some(9), &TrackerCountVector { url: 4, ..TrackerCountVector::ZERO });

        early.replay(&mut aggregator);
        assert_eq!(aggregator.current_tab(), Some(3));
        assert!(aggregator.current_counts().is_zero());

        aggregator.handle_event(TabEvent::Activated(5));
        early.replay(&mut aggregator);
        assert_eq!(aggregator.current_tab(), Some(5));
    }
}
