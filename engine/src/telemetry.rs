//! Telemetry and Observability
//!
//! Handles setting up `tracing-subscriber` for structured logging.
//! Supports config-driven log levels, environment variable overrides,
//! and format switching between pretty (debug) and JSON (release).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber with the given log level.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter.
///
/// Logs go to stderr so answers printed on stdout stay clean for `--json`.
/// Only the first successful call installs a subscriber; later calls are no-ops.
pub fn init_telemetry_with_level(log_level: &str) {
    let default_filter = format!("warn,swarm_engine={},swarm={}", log_level, log_level);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}
