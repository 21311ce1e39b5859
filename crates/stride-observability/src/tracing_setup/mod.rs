//! Tracing setup: subscriber initialization, named events, and spans.

pub mod events;
pub mod spans;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive.
pub const LOG_ENV_VAR: &str = "STRIDE_LOG";

/// Install a JSON subscriber filtered by `STRIDE_LOG`, defaulting to `info`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    init_tracing_with_default("info")
}

/// Like [`init_tracing`], with a fallback level used when `STRIDE_LOG` is unset.
pub fn init_tracing_with_default(default_level: &str) -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .try_init()
        .is_ok()
}

/// Install a subscriber with an explicit filter string (tests, embedding).
pub fn init_tracing_with_filter(filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(true)
        .json()
        .try_init()
        .is_ok()
}
