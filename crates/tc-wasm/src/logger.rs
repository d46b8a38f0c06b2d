//! `log` backend writing to the browser console.

use std::str::FromStr;

use log::{Level, LevelFilter, Log, Metadata, Record};
use wasm_bindgen::prelude::*;
use web_sys::console;

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => console::error_1(&line),
            Level::Warn => console::warn_1(&line),
            Level::Info => console::info_1(&line),
            Level::Debug | Level::Trace => console::log_1(&line),
        }
    }

    fn flush(&self) {}
}

/// Route `log` records to the console. Safe to call more than once; later
/// calls only change the level.
pub fn install(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_err() {
        log::trace!("Console logger already installed");
    }
    log::set_max_level(level);
}

/// Install the console logger at `level` (`"error"` … `"trace"`, default `"info"`).
#[wasm_bindgen]
pub fn init_logging(level: Option<String>) {
    let filter = level
        .as_deref()
        .and_then(|l| LevelFilter::from_str(l).ok())
        .unwrap_or(LevelFilter::Info);
    install(filter);
}
