//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "tilawa=info,tilawa_lib=info";

/// Install a stderr subscriber filtered by `RUST_LOG`, or `default_filter`
/// when it is unset. Returns false if a subscriber was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
