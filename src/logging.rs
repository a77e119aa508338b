//! Log subscriber setup for the binary.
//!
//! Logs go to stderr so stdout carries only command output. The filter comes
//! from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "postframe=info";

/// Install the global fmt subscriber. Calling it again is a no-op.
pub fn init() {
    init_with(DEFAULT_FILTER);
}

/// Like [`init`], with an explicit fallback filter (`-v` maps to `debug`).
pub fn init_with(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(fallback, "logging initialized");
    }
}
