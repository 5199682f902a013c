//! Logging setup for applications embedding the canvas backend
//!
//! The crate itself only emits `tracing` events under the `dear-imgui-canvas`
//! target; these helpers install a `tracing-subscriber` formatter for hosts
//! that don't bring their own.

use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "dear-imgui-canvas=info,warn";

/// Initialize a tracing subscriber honoring `RUST_LOG`, falling back to
/// info-level output for this crate and warnings for everything else
///
/// Returns `false` if a global subscriber was already set; the existing one
/// is left in place.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok()
}

/// Initialize a tracing subscriber with a custom filter
///
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing_with_filter(filter: &str) -> bool {
    fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(true)
        .try_init()
        .is_ok()
}
