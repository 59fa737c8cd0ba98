//! Error types for the state watcher.

use tandem_config::ConfigError;
use tandem_core::{EventError, StorageError};
use thiserror::Error;

/// Errors that can occur while watching resources.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Reading from the store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Emitting an event failed.
    #[error("Event bus error: {0}")]
    Bus(#[from] EventError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tracked-location pattern failed to compile.
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// File system watching error.
    #[error("File watching error: {0}")]
    Watch(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for watch operations.
pub type WatchResult<T> = std::result::Result<T, WatchError>;
