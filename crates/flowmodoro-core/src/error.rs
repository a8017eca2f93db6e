//! Core error types for flowmodoro-core.
//!
//! Input validation errors are resolved at the boundary (ratio entry,
//! history import, audio loading) and never reach the timer engine, which
//! has no failure paths of its own.

use std::path::PathBuf;
use thiserror::Error;

use crate::ratio::Ratio;

/// Core error type for flowmodoro-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A user-entered ratio was rejected
    #[error("Invalid ratio: {0}")]
    InvalidRatio(#[from] RatioError),

    /// History export/import errors
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Alert sound errors
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ratio entry errors. The previously stored ratio is always retained.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RatioError {
    #[error("'{input}' is not a finite number")]
    NotANumber { input: String },

    #[error("'{input}' must be greater than zero")]
    NotPositive { input: String },

    #[error("'{input}' exceeds the maximum of {max}")]
    AboveMax { input: String, max: Ratio },
}

/// History log errors.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Import data was not a valid history document. Existing history is kept.
    #[error("Failed to parse imported history: {0}")]
    ImportParse(#[source] serde_json::Error),

    /// Export serialization failed
    #[error("Failed to serialize history: {0}")]
    Export(#[source] serde_json::Error),
}

/// Alert sound errors. Non-fatal: the scheduler degrades to silence.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load alert sound from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Alert sound at {path} is empty")]
    Empty { path: PathBuf },

    /// The output could not decode the sound data.
    #[error("Failed to decode alert sound {path}: {message}")]
    Decode { path: PathBuf, message: String },
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

    /// Key does not exist in the configuration
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home directory could not be resolved or created
    #[error("Configuration directory unavailable: {0}")]
    DirUnavailable(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
