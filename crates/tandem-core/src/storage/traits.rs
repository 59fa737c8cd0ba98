//! Storage boundary traits.
//!
//! The synchronization core never touches resources directly. It reads field
//! values through [`FieldReader`], writes them through [`FieldWriter`] and
//! learns about external changes from a stream of [`StorageNotification`]s.

use crate::error::StorageResult;
use crate::types::{CorrelationId, FieldValue, ResourceId, Snapshot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Read access to resource fields.
#[async_trait]
pub trait FieldReader: Send + Sync {
    /// Read the current field values of a resource.
    async fn read_fields(&self, id: &ResourceId) -> StorageResult<Snapshot>;

    /// List every resource the store knows about.
    async fn list_resources(&self) -> StorageResult<Vec<ResourceId>>;
}

/// Write access to resource fields.
#[async_trait]
pub trait FieldWriter: Send + Sync {
    /// Write one field.
    ///
    /// When the store [`supports_correlation`](Self::supports_correlation),
    /// the `Modified` notification caused by this write carries `origin`.
    async fn write_field(
        &self,
        id: &ResourceId,
        field: &str,
        value: FieldValue,
        origin: Option<CorrelationId>,
    ) -> StorageResult<()>;

    /// Whether notifications echo the correlation id passed to
    /// [`write_field`](Self::write_field).
    fn supports_correlation(&self) -> bool {
        false
    }
}

/// A store that can both read and write fields.
pub trait FieldStore: FieldReader + FieldWriter {}

impl<T: FieldReader + FieldWriter + ?Sized> FieldStore for T {}

/// Change notification from the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageNotification {
    /// A resource appeared.
    Created {
        /// New resource.
        id: ResourceId,
    },
    /// A resource's content changed.
    Modified {
        /// Changed resource.
        id: ResourceId,
        /// Correlation id of the write, when the store tags writes.
        origin: Option<CorrelationId>,
    },
    /// A resource was removed.
    Deleted {
        /// Removed resource.
        id: ResourceId,
    },
    /// A resource moved.
    Renamed {
        /// Previous identifier.
        from: ResourceId,
        /// New identifier.
        to: ResourceId,
    },
}

impl StorageNotification {
    /// Resource the notification is about (the destination for renames).
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Self::Created { id } | Self::Modified { id, .. } | Self::Deleted { id } => id,
            Self::Renamed { to, .. } => to,
        }
    }

    /// Short name used in logs.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Modified { .. } => "modified",
            Self::Deleted { .. } => "deleted",
            Self::Renamed { .. } => "renamed",
        }
    }
}
