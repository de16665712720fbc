use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE: &str = "ytadvisor.log";

fn filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("ytadvisor={level}")))
}

/// Logs to stderr for the command-line modes.
pub fn init_stderr(verbose: u8) -> Result<()> {
    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| Error::custom(format!("Failed to initialise logging: {e}")))
}

/// The terminal UI owns the screen, so logs go to a file in the data directory.
/// Always records at least `info`.
pub fn init_file(data_dir: &Path, verbose: u8) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let file = File::create(data_dir.join(LOG_FILE))?;

    tracing_subscriber::registry()
        .with(filter(verbose.max(1)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| Error::custom(format!("Failed to initialise logging: {e}")))
}
