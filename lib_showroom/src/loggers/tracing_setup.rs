//! # Tracing Setup
//!
//! Installs the global `tracing` subscriber:
//!
//! - an `EnvFilter` built from `RUST_LOG`, falling back to the configured level,
//! - a console layer on stderr, plain or JSON,
//! - an optional JSON file layer rotated daily under the configured directory.
//!
//! stdout is left alone so that binaries can print data on it.

use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::configs::LogSettings;
use crate::error::SyncError;

/// File name prefix of the rolling log files.
pub const LOG_FILE_PREFIX: &str = "showroom";

/// Initializes logging from `settings`.
///
/// # Returns
///
/// The worker guard of the file writer when a log directory is configured.
/// Keep it alive until shutdown; dropping it flushes and closes the file.
///
/// # Errors
///
/// Fails if the log directory cannot be created, the level is not a valid
/// filter directive, or a global subscriber is already installed.
pub fn init_tracing(settings: &LogSettings) -> Result<Option<WorkerGuard>, SyncError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| SyncError::Config(format!("invalid log level '{}': {e}", settings.level)))?;

    let (file_layer, guard) = match &settings.dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let (writer, guard) = non_blocking(rolling::daily(dir, LOG_FILE_PREFIX));
            let layer = fmt::layer().with_ansi(false).with_writer(writer).json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_plain = (!settings.json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
    });
    let console_json = settings
        .json
        .then(|| fmt::layer().with_writer(std::io::stderr).json());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_plain)
        .with(console_json)
        .with(file_layer)
        .try_init()
        .map_err(|e| SyncError::Config(format!("tracing already initialized: {e}")))?;

    tracing::info!(level = %settings.level, json = settings.json, "logging initialized");
    Ok(guard)
}
