//! `tracing` subscriber setup for binaries and tests embedding the reconciler.

use tracing_subscriber::EnvFilter;

/// Fallback filter of [`init_logging`]: `info` for every target.
pub const DEFAULT_FILTER: &str = "info";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to `default_filter`.
///
/// Returns `false` if a global subscriber was already set.
pub fn try_init_logging(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Same as [`try_init_logging`] with [`DEFAULT_FILTER`] as the fallback.
pub fn init_logging() {
    try_init_logging(DEFAULT_FILTER);
}
