//! Browser tests for the DOM bindings. Run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use tc_core::detect::{detect_canvas_fingerprint, detect_webgl_fingerprint};
use tc_core::message::Ack;
use tc_wasm::content::{collect_snapshot, DomSurfaces};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn window_and_document() -> (web_sys::Window, web_sys::Document) {
    let window = web_sys::window().unwrap();
    let document = window.document().unwrap();
    (window, document)
}

#[wasm_bindgen_test]
fn canvas_probe_reads_pixels() {
    let (_, document) = window_and_document();
    assert!(detect_canvas_fingerprint(&DomSurfaces::new(document)));
}

#[wasm_bindgen_test]
fn webgl_probe_matches_context_support() {
    let (_, document) = window_and_document();
    let canvas = document
        .create_element("canvas")
        .unwrap()
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .unwrap();
    let supported = canvas.get_context("webgl").unwrap().is_some();

    assert_eq!(detect_webgl_fingerprint(&DomSurfaces::new(document)), supported);
}

#[wasm_bindgen_test]
fn snapshot_collects_links_and_scripts() {
    let (window, document) = window_and_document();
    let body = document.body().unwrap();

    let link = document.create_element("a").unwrap();
    link.set_attribute("href", "https://shop.example/?utm_source=mail").unwrap();
    body.append_child(&link).unwrap();

    let script = document.create_element("script").unwrap();
    script.set_text_content(Some("document.addEventListener('scroll', f)"));
    body.append_child(&script).unwrap();

    let page = collect_snapshot(&window, &document);
    assert!(page.links.iter().any(|href| href.contains("utm_source=")));
    assert!(page.inline_scripts.iter().any(|body| body.contains("addEventListener")));
    assert!(!page.url.is_empty());
}

#[wasm_bindgen_test]
fn ack_round_trips_through_js() {
    let value = tc_wasm::chrome::to_js(&Ack::ok()).unwrap();
    let ack: Ack = serde_wasm_bindgen::from_value(value).unwrap();
    assert_eq!(ack, Ack::ok());
}
