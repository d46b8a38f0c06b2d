//! Tracker detectors, one per category.
//!
//! Every detector is synchronous and total: internal failures are logged and
//! degrade to a zero count (or `false`), never to an error for the caller.

pub mod behavioral;
pub mod fingerprint;
pub mod network;
pub mod storage;

pub use behavioral::count_behavioral_trackers;
pub use fingerprint::{
    detect_canvas_fingerprint, detect_webgl_fingerprint, CanvasSurface, GlParameter, GlSurface,
    NoSurfaces, ProbeError, SurfaceFactory,
};
pub use network::{
    count_network_trackers, count_tracking_urls, has_tracking_domain, has_tracking_params,
    is_tracking_url,
};
pub use storage::count_storage_trackers;
