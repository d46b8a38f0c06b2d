//! Content-script side: DOM snapshot, rendering probes, scan loop.

use std::cell::RefCell;
use std::rc::Rc;

use tc_core::detect::fingerprint::{PROBE_HEIGHT, PROBE_WIDTH};
use tc_core::detect::{CanvasSurface, GlParameter, GlSurface, ProbeError, SurfaceFactory};
use tc_core::page::StorageEntry;
use tc_core::scanner::report_counts;
use tc_core::{Ack, CountReporter, Message, PageScanner, PageSnapshot, ReportError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlAnchorElement, HtmlCanvasElement, HtmlDocument,
    HtmlIFrameElement, HtmlImageElement, HtmlScriptElement, MutationObserver, MutationObserverInit,
    PerformanceEntry, Storage, WebGlRenderingContext, Window,
};

use crate::chrome;

// =============================================================================
// Rendering Probes
// =============================================================================

/// Creates detached canvases in `document`.
pub struct DomSurfaces {
    document: Document,
}

impl DomSurfaces {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn create_canvas(&self) -> Result<HtmlCanvasElement, ProbeError> {
        let canvas = self
            .document
            .create_element("canvas")
            .map_err(probe_error)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| ProbeError::Unavailable("canvas"))?;
        canvas.set_width(PROBE_WIDTH);
        canvas.set_height(PROBE_HEIGHT);
        Ok(canvas)
    }
}

pub struct DomCanvas {
    context: CanvasRenderingContext2d,
}

pub struct DomGl {
    context: WebGlRenderingContext,
}

impl SurfaceFactory for DomSurfaces {
    type Canvas = DomCanvas;
    type Gl = DomGl;

    fn canvas_2d(&self) -> Result<DomCanvas, ProbeError> {
        let context = self
            .create_canvas()?
            .get_context("2d")
            .map_err(probe_error)?
            .ok_or(ProbeError::Unavailable("2d"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| ProbeError::Unavailable("2d"))?;
        Ok(DomCanvas { context })
    }

    fn webgl(&self) -> Result<DomGl, ProbeError> {
        let context = self
            .create_canvas()?
            .get_context("webgl")
            .map_err(probe_error)?
            .ok_or(ProbeError::Unavailable("webgl"))?
            .dyn_into::<WebGlRenderingContext>()
            .map_err(|_| ProbeError::Unavailable("webgl"))?;
        Ok(DomGl { context })
    }
}

impl CanvasSurface for DomCanvas {
    fn set_font(&mut self, font: &str) -> Result<(), ProbeError> {
        self.context.set_font(font);
        Ok(())
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), ProbeError> {
        self.context.fill_text(text, x, y).map_err(probe_error)
    }

    fn read_pixels(&mut self, width: u32, height: u32) -> Result<Vec<u8>, ProbeError> {
        let image = self
            .context
            .get_image_data(0.0, 0.0, f64::from(width), f64::from(height))
            .map_err(probe_error)?;
        Ok(image.data().0)
    }
}

impl GlSurface for DomGl {
    fn get_parameter(&mut self, parameter: GlParameter) -> Result<Option<String>, ProbeError> {
        let name = match parameter {
            GlParameter::Version => WebGlRenderingContext::VERSION,
            GlParameter::ShadingLanguageVersion => WebGlRenderingContext::SHADING_LANGUAGE_VERSION,
        };
        let value = self.context.get_parameter(name).map_err(probe_error)?;
        Ok(value.as_string())
    }
}

fn probe_error(err: JsValue) -> ProbeError {
    ProbeError::CallFailed(chrome::error_message(&err))
}

// =============================================================================
// DOM Snapshot
// =============================================================================

/// Read everything the detectors need from the live document.
pub fn collect_snapshot(window: &Window, document: &Document) -> PageSnapshot {
    let mut page = PageSnapshot::new(current_href(window));
    page.links = collect_urls(document, "a[href]", HtmlAnchorElement::href);
    page.script_sources = collect_urls(document, "script[src]", HtmlScriptElement::src);
    page.iframe_sources = collect_urls(document, "iframe[src]", HtmlIFrameElement::src);
    page.image_sources = collect_urls(document, "img[src]", HtmlImageElement::src);
    page.inline_scripts = query_all(document, "script:not([src])")
        .iter()
        .filter_map(|el| el.text_content())
        .filter(|body| !body.trim().is_empty())
        .collect();
    page.resource_entries = resource_entries(window);
    page.local_storage = read_storage(window.local_storage());
    page.session_storage = read_storage(window.session_storage());
    page.cookies = document
        .dyn_ref::<HtmlDocument>()
        .and_then(|doc| doc.cookie().ok())
        .unwrap_or_default();
    page
}

fn current_href(window: &Window) -> String {
    window.location().href().unwrap_or_default()
}

fn query_all(document: &Document, selector: &str) -> Vec<Element> {
    let list = match document.query_selector_all(selector) {
        Ok(list) => list,
        Err(e) => {
            log::debug!("Selector '{selector}' failed: {}", chrome::error_message(&e));
            return Vec::new();
        }
    };
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

fn collect_urls<T: JsCast>(document: &Document, selector: &str, read: fn(&T) -> String) -> Vec<String> {
    query_all(document, selector)
        .into_iter()
        .filter_map(|el| el.dyn_into::<T>().ok())
        .map(|el| read(&el))
        .filter(|url| !url.is_empty())
        .collect()
}

fn resource_entries(window: &Window) -> Vec<String> {
    let Some(performance) = window.performance() else {
        return Vec::new();
    };
    performance
        .get_entries_by_type("resource")
        .iter()
        .filter_map(|entry| entry.dyn_into::<PerformanceEntry>().ok())
        .map(|entry| entry.name())
        .collect()
}

fn read_storage(storage: Result<Option<Storage>, JsValue>) -> Vec<StorageEntry> {
    let storage = match storage {
        Ok(Some(storage)) => storage,
        Ok(None) => return Vec::new(),
        Err(e) => {
            log::debug!("Web storage not accessible: {}", chrome::error_message(&e));
            return Vec::new();
        }
    };
    let len = storage.length().unwrap_or(0);
    (0..len)
        .filter_map(|i| storage.key(i).ok().flatten())
        .map(|key| {
            let value = storage.get_item(&key).ok().flatten().unwrap_or_default();
            StorageEntry { key, value }
        })
        .collect()
}

// =============================================================================
// Reporting
// =============================================================================

/// Delivers counts through `chrome.runtime.sendMessage`.
pub struct RuntimeReporter;

impl CountReporter for RuntimeReporter {
    async fn send(&self, message: &Message) -> Result<Ack, ReportError> {
        if !chrome::runtime_available() {
            return Err(ReportError::ReceiverUnavailable);
        }
        let payload = chrome::to_js(message).map_err(|e| ReportError::Delivery(e.to_string()))?;
        match chrome::send_message(payload).await {
            Ok(reply) => serde_wasm_bindgen::from_value::<Ack>(reply)
                .map_err(|e| ReportError::Delivery(format!("unexpected reply: {e}"))),
            Err(err) => {
                let message = chrome::error_message(&err);
                if message.contains("Receiving end does not exist")
                    || message.contains("Extension context invalidated")
                {
                    Err(ReportError::ReceiverUnavailable)
                } else {
                    Err(ReportError::Delivery(message))
                }
            }
        }
    }
}

// =============================================================================
// Scan Loop
// =============================================================================

struct ContentContext {
    window: Window,
    document: Document,
    scanner: RefCell<PageScanner>,
}

impl ContentContext {
    fn scan_and_report(&self) {
        let page = collect_snapshot(&self.window, &self.document);
        let surfaces = DomSurfaces::new(self.document.clone());
        let counts = self.scanner.borrow_mut().scan(&page, &surfaces);
        spawn_local(async move {
            report_counts(&RuntimeReporter, counts).await;
        });
    }

    fn on_mutation(&self) {
        let href = current_href(&self.window);
        let changed = self.scanner.borrow_mut().observe_url(&href);
        if changed {
            log::debug!("Route changed to {href}, rescanning");
            self.scan_and_report();
        }
    }
}

/// Scan the page when it is ready and again whenever its URL changes
/// without a navigation.
#[wasm_bindgen]
pub fn start_content_scanner() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window in this context"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document in this context"))?;

    let ctx = Rc::new(ContentContext {
        window,
        document,
        scanner: RefCell::new(PageScanner::new()),
    });
    ctx.scanner.borrow_mut().observe_url(&current_href(&ctx.window));

    let ready_state = js_sys::Reflect::get(&ctx.document, &JsValue::from_str("readyState"))
        .ok()
        .and_then(|state| state.as_string());
    if ready_state.as_deref() == Some("loading") {
        let ready_ctx = Rc::clone(&ctx);
        let on_ready = Closure::<dyn FnMut()>::new(move || ready_ctx.scan_and_report());
        ctx.document
            .add_event_listener_with_callback("DOMContentLoaded", on_ready.as_ref().unchecked_ref())?;
        on_ready.forget();
    } else {
        ctx.scan_and_report();
    }

    let observer_ctx = Rc::clone(&ctx);
    let on_mutation = Closure::<dyn FnMut()>::new(move || observer_ctx.on_mutation());
    let observer = MutationObserver::new(on_mutation.as_ref().unchecked_ref())?;
    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    observer.observe_with_options(&ctx.document, &options)?;
    on_mutation.forget();

    Ok(())
}
