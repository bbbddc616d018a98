//! Tracing subscriber setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{CliConfig, LogFormat};

/// Build the event filter: `RUST_LOG` when set, otherwise the verbosity
/// default
#[must_use]
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_directive()))
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable. A second call is a no-op.
pub fn init_logging(config: &CliConfig) {
    let filter = env_filter(config);
    let result = match config.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.verbosity.is_verbose())
                    .with_ansi(config.color.should_color()),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
