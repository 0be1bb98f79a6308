//! Logging init: tracing to stderr with an env-overridable filter.
//!
//! tgdl runs in the foreground (typically a container), so stderr is the
//! log sink. Concurrent download tasks log through the same subscriber,
//! which serializes writes; torn lines need no extra locking.

use tracing_subscriber::EnvFilter;

/// Initialize tracing to stderr. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tgdl=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
