//! Process-wide logging setup.

use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install log bridge: {0}")]
    LogBridge(#[from] log::SetLoggerError),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. `log` records from
/// dependencies and the database layer are forwarded into tracing. A second
/// call returns an error and leaves the first setup in place.
pub fn init_logging(default_filter: &str) -> Result<(), TelemetryError> {
    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter);

    tracing_log::LogTracer::init()?;
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
