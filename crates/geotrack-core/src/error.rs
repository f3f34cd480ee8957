//! Core error types for geotrack-core.
//!
//! Nothing in this subsystem is fatal to the host process: every failure
//! degrades to "tracking not active" or "no data yet".

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for geotrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The provider subscription cannot start because the user has not
    /// granted location permission. The transition is aborted and the
    /// machine reverts to `Stopped`.
    #[error("location permission not granted")]
    PermissionDenied,

    /// No location has ever been recorded. Returned from the query
    /// surface, not fatal.
    #[error("no location recorded yet")]
    NotFound,

    /// The provider subscribe call itself failed.
    #[error("location provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Persistent state errors
    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Collector push errors. Pushes are best-effort telemetry, so these
    /// are normally logged rather than propagated.
    #[error("Collector error: {0}")]
    Sink(#[from] SinkError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// State-store-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store directory could not be created or resolved
    #[error("Failed to open state store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the record failed
    #[error("Failed to read state record at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the record failed
    #[error("Failed to write state record at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The on-disk record is not valid TOML
    #[error("Failed to parse state record: {0}")]
    ParseFailed(String),

    /// The record could not be serialized
    #[error("Failed to encode state record: {0}")]
    EncodeFailed(String),
}

/// Provider subscription errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The platform permission for continuous location access is missing
    #[error("location permission not granted")]
    PermissionDenied,

    /// The provider rejected or could not service the subscription
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl From<ProviderError> for CoreError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::PermissionDenied => CoreError::PermissionDenied,
            ProviderError::Unavailable(msg) => CoreError::ProviderUnavailable(msg),
        }
    }
}

/// Collector-push errors.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The request could not be built or sent
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The collector answered with a non-2xx status
    #[error("collector returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Missing or unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
