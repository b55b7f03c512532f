//! Core error types for wakepoint-core.
//!
//! Nothing in this hierarchy crosses the public scheduling API: the
//! scheduler converts driver faults into a `false` return plus a log line,
//! and the delivery unit logs and terminates. These types exist for the
//! init/store paths, where the host can actually act on the failure.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for wakepoint-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Durable store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable-store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the store database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Store query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    /// Failed to resolve the data directory
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Configuration errors raised at init time.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A surface name was configured but never registered
    #[error("Surface '{0}' is not registered")]
    UnknownSurface(String),

    /// Invalid option value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Alarm driver registration faults.
///
/// The platform analogue of a security/runtime fault raised by the OS alarm
/// service. Callers of the public scheduling API never see this type.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The driver refused the registration
    #[error("Alarm registration rejected: {0}")]
    Rejected(String),

    /// No execution context is available to arm the alarm
    #[error("No runtime available to arm the alarm: {0}")]
    NoRuntime(String),
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
