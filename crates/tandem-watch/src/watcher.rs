//! State watcher: turns storage notifications into field-level events.
//!
//! The watcher keeps the last completed snapshot of the tracked fields of
//! every tracked resource. On each modification it reads the resource again,
//! diffs against that snapshot and publishes:
//!
//! 1. `StatusChanged` when the status text differs
//! 2. `DoneChanged` when the done flag differs
//! 3. one `ResourceUpdated` listing every tracked field whose value differs
//!
//! The stored snapshot is replaced after every successful read, whether or
//! not anything changed. A modification that arrives while a read of the
//! same resource is in flight is ignored; the read releases the resource
//! before its events are published.

use crate::classify::ResourceClassifier;
use crate::error::{WatchError, WatchResult};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tandem_config::{FieldNames, LocationConfig, ResourceClass};
use tandem_core::events::{EmitOutcome, EventBus, EventKind, EventPayload};
use tandem_core::{CorrelationId, FieldReader, ResourceId, Snapshot, StorageNotification};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// In-flight reads, flagged `true` when the resource is deleted mid-read.
type InFlight = Mutex<HashMap<ResourceId, bool>>;

/// Removes a resource from the in-flight set when dropped.
struct InFlightGuard<'a> {
    set: &'a InFlight,
    id: ResourceId,
}

impl InFlightGuard<'_> {
    fn deleted(&self) -> bool {
        self.set.lock().get(&self.id).copied().unwrap_or(false)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

/// Watches a [`FieldReader`] and publishes field-change events on a bus.
pub struct StateWatcher {
    store: Arc<dyn FieldReader>,
    bus: EventBus,
    classifier: ResourceClassifier,
    fields: FieldNames,
    tracked_fields: Vec<String>,
    snapshots: RwLock<HashMap<ResourceId, Snapshot>>,
    in_flight: InFlight,
    initialized: AtomicBool,
}

impl StateWatcher {
    /// Create a watcher over `store` that publishes on `bus`.
    pub fn new(
        store: Arc<dyn FieldReader>,
        bus: EventBus,
        locations: &[LocationConfig],
        fields: FieldNames,
    ) -> WatchResult<Self> {
        let classifier = ResourceClassifier::from_locations(locations)?;
        let tracked_fields = fields.tracked();
        Ok(Self {
            store,
            bus,
            classifier,
            fields,
            tracked_fields,
            snapshots: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            initialized: AtomicBool::new(false),
        })
    }

    /// Seed baseline snapshots for every tracked resource without emitting
    /// events. Returns the number of resources seeded.
    ///
    /// Resources that fail to read are logged and skipped; they get a
    /// baseline on their next notification.
    pub async fn initialize(&self) -> WatchResult<usize> {
        let resources = self.store.list_resources().await?;
        let mut seeded = HashMap::new();

        for id in resources {
            if !self.classifier.is_tracked(&id) {
                continue;
            }
            match self.store.read_fields(&id).await {
                Ok(fields) => {
                    seeded.insert(id, fields.project(&self.tracked_fields));
                }
                Err(e) => {
                    warn!(resource_id = %id, "Skipping resource during initialization: {}", e);
                }
            }
        }

        let count = seeded.len();
        self.snapshots.write().extend(seeded);
        self.initialized.store(true, Ordering::SeqCst);
        info!(tracked = count, "State watcher initialized");
        Ok(count)
    }

    /// Whether [`initialize`](Self::initialize) has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Last completed snapshot of a resource.
    pub fn snapshot(&self, id: &ResourceId) -> Option<Snapshot> {
        self.snapshots.read().get(id).cloned()
    }

    /// Number of resources with a stored snapshot.
    pub fn tracked_count(&self) -> usize {
        self.snapshots.read().len()
    }

    /// Ids of every resource with a stored snapshot.
    pub fn tracked_resources(&self) -> Vec<ResourceId> {
        let mut ids: Vec<_> = self.snapshots.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Classification of a resource, `None` when untracked.
    pub fn classify(&self, id: &ResourceId) -> Option<ResourceClass> {
        self.classifier.classify(id)
    }

    /// Route a storage notification to the matching handler.
    ///
    /// Returns the kinds of the events published. Notifications arriving
    /// before initialization are dropped.
    pub async fn handle_notification(
        &self,
        notification: StorageNotification,
    ) -> WatchResult<Vec<EventKind>> {
        if !self.is_initialized() {
            warn!(
                resource_id = %notification.resource_id(),
                action = notification.action(),
                "Dropping notification received before initialization"
            );
            return Ok(Vec::new());
        }

        match notification {
            StorageNotification::Created { id } => self.resource_created(&id).await,
            StorageNotification::Modified { id, origin } => {
                self.resource_modified(&id, origin).await
            }
            StorageNotification::Deleted { id } => self.resource_deleted(&id).await,
            StorageNotification::Renamed { from, to } => self.resource_renamed(&from, &to).await,
        }
    }

    /// Diff a modified resource against its last snapshot and publish the
    /// resulting events.
    pub async fn resource_modified(
        &self,
        id: &ResourceId,
        origin: Option<CorrelationId>,
    ) -> WatchResult<Vec<EventKind>> {
        let Some(class) = self.classifier.classify(id) else {
            return Ok(Vec::new());
        };
        let Some(guard) = self.enter(id) else {
            debug!(resource_id = %id, "Modification ignored, resource already in flight");
            return Ok(Vec::new());
        };

        let current = match self.store.read_fields(id).await {
            Ok(fields) => fields.project(&self.tracked_fields),
            Err(e) => {
                error!(resource_id = %id, "Failed to read modified resource: {}", e);
                return Err(WatchError::Storage(e));
            }
        };

        let previous = {
            let mut snapshots = self.snapshots.write();
            if guard.deleted() {
                debug!(resource_id = %id, "Resource deleted during read, snapshot discarded");
                return Ok(Vec::new());
            }
            snapshots
                .insert(id.clone(), current.clone())
                .unwrap_or_default()
        };
        // A synchronous bus runs handlers inline, and their writes come back
        // as new modifications of this resource.
        drop(guard);

        let mut payloads = Vec::new();

        let old_status = previous.text(&self.fields.status);
        let new_status = current.text(&self.fields.status);
        if old_status != new_status {
            payloads.push(EventPayload::StatusChanged {
                resource_id: id.clone(),
                old_status: old_status.map(str::to_string),
                new_status: new_status.map(str::to_string),
                snapshot: current.clone(),
                class,
                origin,
            });
        }

        let old_done = previous.flag(&self.fields.done);
        let new_done = current.flag(&self.fields.done);
        if old_done != new_done {
            payloads.push(EventPayload::DoneChanged {
                resource_id: id.clone(),
                old_done,
                new_done,
                snapshot: current.clone(),
                class,
                origin,
            });
        }

        let changed_fields: Vec<String> = self
            .tracked_fields
            .iter()
            .filter(|field| previous.get(field) != current.get(field))
            .cloned()
            .collect();
        if !changed_fields.is_empty() {
            debug!(resource_id = %id, fields = ?changed_fields, "Tracked fields changed");
            payloads.push(EventPayload::ResourceUpdated {
                resource_id: id.clone(),
                changed_fields,
                snapshot: current,
                class,
                origin,
            });
        }

        self.publish_all(payloads).await
    }

    /// Record a new resource and publish `ResourceCreated`.
    pub async fn resource_created(&self, id: &ResourceId) -> WatchResult<Vec<EventKind>> {
        let Some(class) = self.classifier.classify(id) else {
            return Ok(Vec::new());
        };

        let snapshot = match self.store.read_fields(id).await {
            Ok(fields) => fields.project(&self.tracked_fields),
            Err(e) => {
                error!(resource_id = %id, "Failed to read created resource: {}", e);
                return Err(WatchError::Storage(e));
            }
        };
        self.snapshots.write().insert(id.clone(), snapshot.clone());

        self.publish_all(vec![EventPayload::ResourceCreated {
            resource_id: id.clone(),
            snapshot,
            class,
        }])
        .await
    }

    /// Forget a resource and publish `ResourceDeleted` with its last snapshot.
    pub async fn resource_deleted(&self, id: &ResourceId) -> WatchResult<Vec<EventKind>> {
        let last_snapshot = {
            let mut snapshots = self.snapshots.write();
            if let Some(deleted) = self.in_flight.lock().get_mut(id) {
                *deleted = true;
            }
            snapshots.remove(id)
        };
        let Some(class) = self.classifier.classify(id) else {
            return Ok(Vec::new());
        };

        self.publish_all(vec![EventPayload::ResourceDeleted {
            resource_id: id.clone(),
            last_snapshot,
            class,
        }])
        .await
    }

    /// Move a snapshot to a new id.
    ///
    /// The snapshot is dropped when the destination is untracked. A rename
    /// from an untracked location into a tracked one is a creation.
    pub async fn resource_renamed(
        &self,
        from: &ResourceId,
        to: &ResourceId,
    ) -> WatchResult<Vec<EventKind>> {
        let moved = self.snapshots.write().remove(from);

        let Some(class) = self.classifier.classify(to) else {
            if moved.is_some() {
                debug!(from = %from, to = %to, "Resource moved out of tracked locations");
            }
            return Ok(Vec::new());
        };

        match moved {
            Some(snapshot) => {
                self.snapshots.write().insert(to.clone(), snapshot);
                self.publish_all(vec![EventPayload::ResourceRenamed {
                    old_id: from.clone(),
                    new_id: to.clone(),
                    class,
                }])
                .await
            }
            None => self.resource_created(to).await,
        }
    }

    /// Initialize, then handle notifications until the channel closes.
    ///
    /// Each notification is handled on its own task so that different
    /// resources proceed concurrently.
    pub async fn run(
        self: Arc<Self>,
        mut notifications: mpsc::UnboundedReceiver<StorageNotification>,
    ) -> WatchResult<()> {
        if !self.is_initialized() {
            self.initialize().await?;
        }

        while let Some(notification) = notifications.recv().await {
            let watcher = Arc::clone(&self);
            tokio::spawn(async move {
                let resource_id = notification.resource_id().clone();
                if let Err(e) = watcher.handle_notification(notification).await {
                    error!(resource_id = %resource_id, "Failed to handle notification: {}", e);
                }
            });
        }

        info!("Notification channel closed, state watcher stopping");
        Ok(())
    }

    fn enter(&self, id: &ResourceId) -> Option<InFlightGuard<'_>> {
        {
            let mut in_flight = self.in_flight.lock();
            if in_flight.contains_key(id) {
                return None;
            }
            in_flight.insert(id.clone(), false);
        }
        Some(InFlightGuard {
            set: &self.in_flight,
            id: id.clone(),
        })
    }

    async fn publish_all(&self, payloads: Vec<EventPayload>) -> WatchResult<Vec<EventKind>> {
        let mut published = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let kind = payload.kind();
            if let EmitOutcome::Cancelled { by, .. } = self.bus.publish(payload).await? {
                debug!(event_kind = %kind, middleware = %by, "Event cancelled");
            }
            published.push(kind);
        }
        Ok(published)
    }
}
