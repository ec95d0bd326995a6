//! Logging setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the stderr subscriber
///
/// `--log-level` wins over `RUST_LOG`; `--debug` is shorthand for
/// `--log-level debug`. Without either, only warnings are shown.
pub fn init(debug: bool, log_level: Option<&str>) {
    let filter = match (log_level, debug) {
        (Some(level), _) => EnvFilter::new(level),
        (None, true) => EnvFilter::new("debug"),
        (None, false) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
