//! Error types for configuration loading and validation.

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error while reading a configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file could not be parsed in the detected format.
    #[error("Failed to parse {format} configuration: {message}")]
    Parse {
        /// Format that was attempted.
        format: &'static str,
        /// Parser message.
        message: String,
    },

    /// File extension does not map to a supported format.
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// Configuration parsed but is not usable.
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// A location glob pattern is malformed.
    #[error("Invalid location pattern '{pattern}': {message}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Globset message.
        message: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
