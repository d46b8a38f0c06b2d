//! WebAssembly bindings for Tracker Counter
//!
//! One module serves both extension contexts:
//!
//! - content scripts call [`start_content_scanner`], which scans the page
//!   once it is ready and again on every in-page route change, and reports
//!   each result to the background;
//! - the background service worker calls [`background_init`] once, then
//!   forwards tab events and runtime messages to [`on_tab_updated`],
//!   [`on_tab_activated`] and [`handle_message`], and may schedule
//!   [`refresh_block_list`] on a timer.

pub mod background;
pub mod chrome;
pub mod content;
pub mod logger;
pub mod store;

pub use background::{active_rule_count, background_init, handle_message, on_tab_activated, on_tab_updated, refresh_block_list};
pub use content::start_content_scanner;
pub use logger::init_logging;
