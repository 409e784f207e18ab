//! Logging setup for binaries embedding the federation core.

/// Initializes logging with the specified level.
///
/// `RUST_LOG` takes precedence when set. This should be called once at
/// application startup; the library itself never installs a subscriber.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("apiary_federation={}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
