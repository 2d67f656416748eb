//! Tracing subscriber setup.
//!
//! Only installed in debug mode (see [`is_debug_mode`]); otherwise the
//! `msg_*` macros print straight to the console and no subscriber is needed.

use crate::libs::messages::macros::is_debug_mode;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "trackvault=debug";

/// Installs a stderr fmt subscriber filtered by `RUST_LOG`, falling back to
/// debug output for this crate. Safe to call more than once.
pub fn init() {
    if !is_debug_mode() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

/// Subscriber for tests: output captured by the test harness.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}
