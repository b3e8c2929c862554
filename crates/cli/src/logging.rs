//! Logging setup using `tracing-subscriber`.
//!
//! Logs go to stderr so stdout stays machine readable. The base level is
//! `warn` (or the configured `[logging] level`), each `-v` raises it one
//! step, and `RUST_LOG` overrides everything.

use std::io;
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Resolve the effective level from the configured base and `-v` count.
pub(crate) fn effective_level(verbosity: u8, configured: Option<&str>) -> Result<Level, String> {
    let base = match configured {
        Some(s) => Level::from_str(s).map_err(|_| {
            format!(
                "invalid log level '{}' (expected error, warn, info, debug or trace)",
                s
            )
        })?,
        None => Level::WARN,
    };
    let ladder = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE];
    let start = ladder.iter().position(|l| *l == base).unwrap_or(1);
    let index = (start + verbosity as usize).min(ladder.len() - 1);
    Ok(ladder[index])
}

/// Install the global subscriber. Later calls are ignored.
pub(crate) fn init_logging(verbosity: u8, configured: Option<&str>) -> Result<(), String> {
    let level = effective_level(verbosity, configured)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time();
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
    Ok(())
}
