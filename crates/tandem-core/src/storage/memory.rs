//! In-memory field store.
//!
//! [`MemoryStore`] keeps resources in a map, forwards every change as a
//! [`StorageNotification`] to an optional subscriber and records the writes
//! made through [`FieldWriter`] so callers can assert on them.
//!
//! ```
//! use tandem_core::storage::{FieldReader, MemoryStore};
//! use tandem_core::{ResourceId, Snapshot};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let id = ResourceId::from("Tasks/a.md");
//! store.insert(id.clone(), Snapshot::new().with("Status", "Todo"));
//!
//! let fields = store.read_fields(&id).await?;
//! assert_eq!(fields.text("Status"), Some("Todo"));
//! # Ok(())
//! # }
//! ```

use super::traits::{FieldReader, FieldWriter, StorageNotification};
use crate::error::{StorageError, StorageResult};
use crate::types::{CorrelationId, FieldValue, ResourceId, Snapshot};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::mpsc;

/// A write made through [`FieldWriter::write_field`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    /// Written resource.
    pub resource_id: ResourceId,
    /// Written field.
    pub field: String,
    /// New value.
    pub value: FieldValue,
    /// Correlation id passed by the writer.
    pub origin: Option<CorrelationId>,
}

/// In-memory [`FieldStore`](super::FieldStore).
#[derive(Debug)]
pub struct MemoryStore {
    resources: RwLock<BTreeMap<ResourceId, Snapshot>>,
    subscriber: Mutex<Option<mpsc::UnboundedSender<StorageNotification>>>,
    writes: Mutex<Vec<WriteRecord>>,
    failing_fields: Mutex<HashSet<String>>,
    correlation: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store whose notifications echo correlation ids.
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(BTreeMap::new()),
            subscriber: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            failing_fields: Mutex::new(HashSet::new()),
            correlation: true,
        }
    }

    /// Create a store whose notifications never carry an origin.
    pub fn without_correlation() -> Self {
        Self {
            correlation: false,
            ..Self::new()
        }
    }

    /// Start receiving notifications. Replaces any previous subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StorageNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.subscriber.lock() = Some(tx);
        rx
    }

    fn notify(&self, notification: StorageNotification) {
        let mut subscriber = self.subscriber.lock();
        if let Some(tx) = subscriber.as_ref() {
            if tx.send(notification).is_err() {
                tracing::debug!("Notification subscriber dropped");
                *subscriber = None;
            }
        }
    }

    /// Seed a resource without sending a notification.
    pub fn insert(&self, id: impl Into<ResourceId>, fields: Snapshot) {
        self.resources.write().insert(id.into(), fields);
    }

    /// Add a resource and notify `Created`.
    pub fn create(&self, id: impl Into<ResourceId>, fields: Snapshot) {
        let id = id.into();
        self.resources.write().insert(id.clone(), fields);
        self.notify(StorageNotification::Created { id });
    }

    /// Apply an external edit to one or more fields and notify a single
    /// untagged `Modified`. Null values remove the field.
    pub fn edit(&self, id: impl Into<ResourceId>, changes: Snapshot) -> StorageResult<()> {
        let id = id.into();
        {
            let mut resources = self.resources.write();
            let fields = resources
                .get_mut(&id)
                .ok_or_else(|| StorageError::NotFound(id.clone()))?;
            for (field, value) in changes.iter() {
                if value.is_null() {
                    fields.remove(field);
                } else {
                    fields.set(field.clone(), value.clone());
                }
            }
        }
        self.notify(StorageNotification::Modified { id, origin: None });
        Ok(())
    }

    /// Remove a resource and notify `Deleted`.
    pub fn delete(&self, id: &ResourceId) -> StorageResult<Snapshot> {
        let removed = self
            .resources
            .write()
            .remove(id)
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;
        self.notify(StorageNotification::Deleted { id: id.clone() });
        Ok(removed)
    }

    /// Move a resource and notify `Renamed`.
    pub fn rename(&self, from: &ResourceId, to: impl Into<ResourceId>) -> StorageResult<()> {
        let to = to.into();
        {
            let mut resources = self.resources.write();
            let fields = resources
                .remove(from)
                .ok_or_else(|| StorageError::NotFound(from.clone()))?;
            resources.insert(to.clone(), fields);
        }
        self.notify(StorageNotification::Renamed {
            from: from.clone(),
            to,
        });
        Ok(())
    }

    /// Make writes to `field` fail until [`heal`](Self::heal) is called.
    pub fn fail_writes_to(&self, field: impl Into<String>) {
        self.failing_fields.lock().insert(field.into());
    }

    /// Stop injecting write failures.
    pub fn heal(&self) {
        self.failing_fields.lock().clear();
    }

    /// Current fields of a resource.
    pub fn fields(&self, id: &ResourceId) -> Option<Snapshot> {
        self.resources.read().get(id).cloned()
    }

    /// Writes recorded so far, in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.lock().clone()
    }

    /// Number of writes recorded so far.
    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }
}

#[async_trait]
impl FieldReader for MemoryStore {
    async fn read_fields(&self, id: &ResourceId) -> StorageResult<Snapshot> {
        self.fields(id).ok_or_else(|| StorageError::NotFound(id.clone()))
    }

    async fn list_resources(&self) -> StorageResult<Vec<ResourceId>> {
        Ok(self.resources.read().keys().cloned().collect())
    }
}

#[async_trait]
impl FieldWriter for MemoryStore {
    async fn write_field(
        &self,
        id: &ResourceId,
        field: &str,
        value: FieldValue,
        origin: Option<CorrelationId>,
    ) -> StorageResult<()> {
        if self.failing_fields.lock().contains(field) {
            return Err(StorageError::Write {
                resource_id: id.clone(),
                field: field.to_string(),
                message: "injected write failure".into(),
            });
        }

        {
            let mut resources = self.resources.write();
            let fields = resources
                .get_mut(id)
                .ok_or_else(|| StorageError::NotFound(id.clone()))?;
            fields.set(field, value.clone());
        }

        self.writes.lock().push(WriteRecord {
            resource_id: id.clone(),
            field: field.to_string(),
            value,
            origin,
        });

        let origin = if self.correlation { origin } else { None };
        self.notify(StorageNotification::Modified {
            id: id.clone(),
            origin,
        });
        Ok(())
    }

    fn supports_correlation(&self) -> bool {
        self.correlation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_records_and_notifies_with_origin() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();
        let id = ResourceId::from("Tasks/a.md");
        store.insert(id.clone(), Snapshot::new().with("Status", "Todo"));

        let token = CorrelationId::new();
        store.write_field(&id, "Done", json!(true), Some(token)).await.unwrap();

        assert_eq!(store.fields(&id).unwrap().flag("Done"), Some(true));
        assert_eq!(store.write_count(), 1);
        assert_eq!(
            rx.recv().await.unwrap(),
            StorageNotification::Modified {
                id,
                origin: Some(token)
            }
        );
    }

    #[tokio::test]
    async fn test_without_correlation_drops_origin() {
        let store = MemoryStore::without_correlation();
        let mut rx = store.subscribe();
        let id = ResourceId::from("Tasks/a.md");
        store.insert(id.clone(), Snapshot::new());

        store
            .write_field(&id, "Done", json!(false), Some(CorrelationId::new()))
            .await
            .unwrap();

        assert!(!store.supports_correlation());
        assert_eq!(
            rx.recv().await.unwrap(),
            StorageNotification::Modified { id, origin: None }
        );
    }

    #[tokio::test]
    async fn test_injected_failure_leaves_fields_untouched() {
        let store = MemoryStore::new();
        let id = ResourceId::from("Tasks/a.md");
        store.insert(id.clone(), Snapshot::new().with("Done", false));
        store.fail_writes_to("Done");

        let err = store.write_field(&id, "Done", json!(true), None).await.unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
        assert_eq!(store.fields(&id).unwrap().flag("Done"), Some(false));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_edit_removes_null_fields() {
        let store = MemoryStore::new();
        let id = ResourceId::from("Tasks/a.md");
        store.insert(id.clone(), Snapshot::new().with("Status", "Todo").with("Done", false));

        store
            .edit(id.clone(), Snapshot::new().with("Status", FieldValue::Null))
            .unwrap();

        let fields = store.fields(&id).unwrap();
        assert_eq!(fields.get("Status"), None);
        assert_eq!(fields.flag("Done"), Some(false));
    }

    #[tokio::test]
    async fn test_rename_moves_fields() {
        let store = MemoryStore::new();
        let from = ResourceId::from("Tasks/a.md");
        store.insert(from.clone(), Snapshot::new().with("Status", "Todo"));

        store.rename(&from, "Tasks/b.md").unwrap();

        assert!(store.read_fields(&from).await.is_err());
        let listed = store.list_resources().await.unwrap();
        assert_eq!(listed, vec![ResourceId::from("Tasks/b.md")]);
    }
}
