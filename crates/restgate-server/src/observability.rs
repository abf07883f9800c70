//! Basic tracing initialization with a configurable log level.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set. Safe to call more
/// than once; later calls are ignored.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
