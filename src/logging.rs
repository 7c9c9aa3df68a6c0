//! Tracing subscriber setup for the binary.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::AppError;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";
const VERBOSE_FILTER: &str = "tank_loader=debug,info";

/// Installs the global subscriber.
///
/// Logs go to stderr so stdout stays clean for command output. When
/// `log_file` is given, a second plain-text layer appends to it.
///
/// # Errors
///
/// Returns `AppError::Config` if the log file cannot be opened.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
    });

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    AppError::Config(format!("Cannot open log file {}: {}", path.display(), e))
                })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Internal(format!("Logging already initialized: {}", e)))
}
