/// Structured logging for the simulator
///
/// Events go through `tracing`. `init_logger` installs a `tracing-subscriber`
/// fmt subscriber on stderr and, optionally, an append-only log file.
/// `RUST_LOG` overrides the configured level when set.
///
/// Lookup failures are classified before logging so an unknown zip code
/// (the user's typo) is not reported with the same weight as a weather
/// service outage.

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt as tfmt};

use crate::model::{BoktaiError, LookupFailure};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warning),
            "ERROR" | "CRITICAL" => Ok(LogLevel::Error),
            _ => Err(LoggingError::UnknownLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown logging level {0:?}")]
    UnknownLevel(String),
    #[error("cannot open log file: {0}")]
    LogFile(#[from] std::io::Error),
    #[error("logger already installed: {0}")]
    Install(String),
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Weather,
    Geocoding,
    Manual,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Weather => write!(f, "WX"),
            DataSource::Geocoding => write!(f, "GEO"),
            DataSource::Manual => write!(f, "MANUAL"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - bad user input, such as an unknown zip code
    Expected,
    /// Unexpected failure - service degradation or an API change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber Setup
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// Console output goes to stderr so the gauge panel on stdout stays clean.
/// `timestamps = false` drops the time column from the console only; the
/// log file always carries timestamps.
pub fn init_logger(level: LogLevel, log_file: Option<&Path>, timestamps: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console = tfmt::layer().with_writer(std::io::stderr).with_target(false);
    layers.push(if timestamps {
        console.boxed()
    } else {
        console.without_time().boxed()
    });

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        layers.push(
            tfmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classifies a lookup or input failure for logging.
pub fn classify_lookup_failure(err: &BoktaiError) -> FailureType {
    match err {
        BoktaiError::InvalidLocation(_) | BoktaiError::InvalidManualInput(_) => FailureType::Expected,
        BoktaiError::Lookup(failure) => match failure {
            // Rate limiting clears on its own
            LookupFailure::Http(429) => FailureType::Unknown,
            LookupFailure::Http(_) | LookupFailure::Transport(_) => FailureType::Unexpected,
            // Parse errors suggest API changes
            LookupFailure::Parse(_) => FailureType::Unexpected,
            LookupFailure::NoData(_) => FailureType::Unknown,
        },
        BoktaiError::Range(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Logs a failure at the level its classification calls for and returns
/// the classification.
pub fn log_lookup_failure(source: DataSource, key: &str, operation: &str, err: &BoktaiError) -> FailureType {
    let failure_type = classify_lookup_failure(err);
    match failure_type {
        FailureType::Expected => debug!(%source, key, "{} failed [{}]: {}", operation, failure_type, err),
        FailureType::Unexpected => error!(%source, key, "{} failed [{}]: {}", operation, failure_type, err),
        FailureType::Unknown => warn!(%source, key, "{} failed [{}]: {}", operation, failure_type, err),
    }
    failure_type
}

// ---------------------------------------------------------------------------
// Refresh Summary Logging
// ---------------------------------------------------------------------------

/// Logs a summary of a bulk refresh.
pub fn log_refresh_summary(source: DataSource, total: usize, successful: usize, failed: usize) {
    if failed == 0 {
        info!(%source, "Refresh complete: {}/{} successful, {} failed", successful, total, failed);
    } else if successful == 0 {
        error!(%source, "Refresh complete: {}/{} successful, {} failed", successful, total, failed);
    } else {
        warn!(%source, "Refresh complete: {}/{} successful, {} failed", successful, total, failed);
    }
}
