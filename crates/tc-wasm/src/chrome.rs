//! Bindings to the extension platform and conversion helpers.

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    pub async fn send_message(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    pub async fn storage_get(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    pub async fn storage_set(items: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "declarativeNetRequest"], js_name = updateDynamicRules)]
    pub async fn update_dynamic_rules(options: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = fetch)]
    pub async fn fetch_with_init(url: &str, init: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = AbortSignal, js_name = timeout)]
    pub fn abort_signal_timeout(ms: f64) -> JsValue;
}

/// Whether the `chrome` extension namespace exists in this context.
pub fn runtime_available() -> bool {
    js_sys::Reflect::has(&js_sys::global(), &JsValue::from_str("chrome")).unwrap_or(false)
}

/// Serialize into plain JS objects (no `Map`s), as the extension APIs expect.
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
}

/// Best-effort message of a thrown JS value.
pub fn error_message(err: &JsValue) -> String {
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

pub fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}
