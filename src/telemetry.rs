// Subscriber setup for the binaries.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG` (default
/// `default_level`). Returns false when a subscriber was already installed.
pub fn init_tracing(default_level: &str) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
