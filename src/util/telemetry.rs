//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "capture_relay=info";

/// Install the default env-based subscriber unless one is already set.
///
/// Falls back to [`DEFAULT_LOG_FILTER`] when `RUST_LOG` is absent or invalid.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_LOG_FILTER);
}

/// Install an fmt subscriber using `RUST_LOG`, or `fallback` when unset.
///
/// Returns `true` if this call installed the global subscriber.
pub fn init_tracing_with(fallback: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
