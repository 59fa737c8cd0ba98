//! Error types for the sync engine and service.

use tandem_config::ConfigError;
use tandem_core::{EventError, ResourceId, StorageError};
use tandem_watch::WatchError;
use thiserror::Error;

/// Errors raised while keeping fields in step.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The resource's status is not in the configured vocabulary.
    #[error("Unknown status '{status}' on '{resource_id}'")]
    UnknownStatus {
        /// Offending resource.
        resource_id: ResourceId,
        /// Status value found.
        status: String,
    },

    /// No configured status has the required done state.
    #[error("No status with done = {done} available for '{resource_id}'")]
    NoCandidateStatus {
        /// Resource being synchronized.
        resource_id: ResourceId,
        /// Done state that had no matching status.
        done: bool,
    },

    /// Storage read or write failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Watcher failed.
    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    /// Event bus failed.
    #[error("Event bus error: {0}")]
    Bus(#[from] EventError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
