use crate::error::{ProtocolError, ProtocolResult};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. `log` records from
/// the library crates are forwarded into the same subscriber.
pub fn init_logging(default_filter: &str) -> ProtocolResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| ProtocolError::Logging(err.to_string()))
}
