//! Behavioral tracking detector.
//!
//! Flags inline scripts that hook user-interaction events and embedded
//! scripts or frames loading a known session-replay library.

use crate::page::PageSnapshot;
use crate::tables::{first_match, EVENT_REGISTRATION_CALLS, INTERACTION_EVENTS, TRACKING_LIBRARIES};

pub fn count_behavioral_trackers(page: &PageSnapshot) -> u32 {
    let listeners = page
        .inline_scripts
        .iter()
        .filter(|body| registers_interaction_listener(body))
        .count();
    let libraries = page
        .embedded_sources()
        .filter(|src| first_match(&src.to_ascii_lowercase(), TRACKING_LIBRARIES).is_some())
        .count();
    u32::try_from(listeners + libraries).unwrap_or(u32::MAX)
}

/// Both an interaction event name and a registration call must appear.
fn registers_interaction_listener(body: &str) -> bool {
    let body = body.to_ascii_lowercase();
    first_match(&body, INTERACTION_EVENTS).is_some()
        && first_match(&body, EVENT_REGISTRATION_CALLS).is_some()
}
