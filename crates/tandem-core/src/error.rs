//! Error types for the event bus and the storage boundary.

use crate::events::EventKind;
use crate::types::ResourceId;
use thiserror::Error;

/// Errors surfaced by [`EventBus`](crate::events::EventBus) dispatch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    /// A middleware stage returned an error.
    #[error("Middleware '{middleware}' failed on {kind}: {message}")]
    MiddlewareFailed {
        /// Middleware name.
        middleware: String,
        /// Kind of the event being processed.
        kind: EventKind,
        /// Error message.
        message: String,
    },

    /// A handler returned an error.
    #[error("Handler '{handler}' failed on {kind}: {message}")]
    HandlerFailed {
        /// Handler name.
        handler: String,
        /// Kind of the event being handled.
        kind: EventKind,
        /// Error message.
        message: String,
    },

    /// A handler did not finish within the timeout.
    #[error("Handler '{handler}' timed out on {kind} after {timeout_ms}ms")]
    HandlerTimeout {
        /// Handler name.
        handler: String,
        /// Kind of the event being handled.
        kind: EventKind,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// A handler task panicked.
    #[error("Handler '{handler}' panicked on {kind}")]
    HandlerPanicked {
        /// Handler name.
        handler: String,
        /// Kind of the event being handled.
        kind: EventKind,
    },

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl EventError {
    /// Create a generic error from a message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Name of the failing middleware or handler, if any.
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            Self::MiddlewareFailed { middleware, .. } => Some(middleware),
            Self::HandlerFailed { handler, .. }
            | Self::HandlerTimeout { handler, .. }
            | Self::HandlerPanicked { handler, .. } => Some(handler),
            Self::Other(_) => None,
        }
    }
}

/// Result type for event operations.
pub type EventResult<T> = std::result::Result<T, EventError>;

/// Errors from the external storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource does not exist.
    #[error("Resource '{0}' not found")]
    NotFound(ResourceId),

    /// Resource exists but its fields could not be read.
    #[error("Failed to read '{resource_id}': {message}")]
    Read {
        /// Resource being read.
        resource_id: ResourceId,
        /// Underlying message.
        message: String,
    },

    /// Field write failed.
    #[error("Failed to write field '{field}' on '{resource_id}': {message}")]
    Write {
        /// Resource being written.
        resource_id: ResourceId,
        /// Field being written.
        field: String,
        /// Underlying message.
        message: String,
    },

    /// Resource content is not in the expected shape.
    #[error("Malformed resource '{resource_id}': {message}")]
    Malformed {
        /// Resource being read.
        resource_id: ResourceId,
        /// What was wrong.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_error_messages_name_the_stage() {
        let err = EventError::HandlerTimeout {
            handler: "slow".into(),
            kind: EventKind::StatusChanged,
            timeout_ms: 10,
        };
        assert_eq!(err.to_string(), "Handler 'slow' timed out on status_changed after 10ms");
        assert_eq!(err.stage_name(), Some("slow"));
        assert_eq!(EventError::other("boom").stage_name(), None);
    }

    #[test]
    fn test_storage_error_names_resource_and_field() {
        let err = StorageError::Write {
            resource_id: "Tasks/a.md".into(),
            field: "Done".into(),
            message: "read-only".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to write field 'Done' on 'Tasks/a.md': read-only"
        );
    }
}
