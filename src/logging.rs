//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Calling it twice is harmless; the second install is ignored.
pub fn init_subscriber(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}
