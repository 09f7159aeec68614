//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a settings file could not become a usable [`CommsSettings`].
///
/// [`CommsSettings`]: crate::CommsSettings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The settings file is not JSON.
    #[error("{} is not valid JSON: {source}", path.display())]
    Syntax {
        /// File that was parsed.
        path: PathBuf,
        /// Parser failure, with line and column.
        source: serde_json::Error,
    },
    /// The merged document does not fit the settings schema, e.g. a string
    /// where a port number belongs.
    #[error("settings do not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
    /// A value is well-typed but unusable, such as a liveness window with no
    /// room for a heartbeat.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
