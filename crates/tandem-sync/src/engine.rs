//! Keeps the status and done fields of a resource consistent.
//!
//! The invariant is `Done == is_done(Status)`. A change to either field is
//! answered by at most one write to the other:
//!
//! ```text
//! StatusChanged ─► re-read ─► Done != is_done(Status)? ─► lock (r, DoneChanged)   ─► write Done
//! DoneChanged   ─► re-read ─► is_done(Status) != Done? ─► lock (r, StatusChanged) ─► write Status
//! ```
//!
//! Decisions are always made on a fresh read of the resource, never on the
//! snapshot carried by the event, so a stale event cannot trigger a write
//! that undoes a newer change.

use crate::error::{SyncError, SyncResult};
use crate::locks::ReentrancyLocks;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tandem_config::{find_status, FieldNames, StatusDefinition, StatusPreferences, SyncConfig};
use tandem_core::events::{Event, EventKind, EventPayload, Handler};
use tandem_core::{FieldStore, FieldValue, ResourceId, Snapshot};
use tracing::{debug, info, warn};

/// Handler name under which the engine registers.
pub const ENGINE_NAME: &str = "field_sync";

/// Whether a resource satisfies the invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Evaluation {
    /// The resource has no status; nothing to enforce.
    NoStatus,
    /// Done already matches the status.
    InSync,
    /// Done disagrees with the status.
    DoneMismatch {
        /// Current status.
        status: String,
        /// Done value implied by the status.
        expected: bool,
        /// Done value found, if any.
        actual: Option<bool>,
    },
}

/// What handling one event did.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Nothing to do; the reason is logged.
    Skipped(&'static str),
    /// The invariant already held.
    InSync,
    /// One field was written.
    Wrote {
        /// Field written.
        field: String,
        /// Value written.
        value: FieldValue,
    },
    /// The status list was replaced.
    StatusesReplaced {
        /// Locks dropped with the old list.
        cleared_locks: usize,
    },
}

/// Counters for engine activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Status/done events handled.
    pub events_handled: u64,
    /// Field writes issued.
    pub writes: u64,
    /// Events where the invariant already held.
    pub in_sync: u64,
    /// Events skipped for missing fields.
    pub skipped: u64,
    /// Echo events recognised and suppressed.
    pub echoes_suppressed: u64,
    /// Events that ended in an error.
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    events_handled: AtomicU64,
    writes: AtomicU64,
    in_sync: AtomicU64,
    skipped: AtomicU64,
    echoes_suppressed: AtomicU64,
    failures: AtomicU64,
}

/// Bidirectional status/done synchronization handler.
pub struct FieldSyncEngine {
    store: Arc<dyn FieldStore>,
    statuses: RwLock<Vec<StatusDefinition>>,
    preferences: StatusPreferences,
    fields: FieldNames,
    locks: Arc<ReentrancyLocks>,
    echo_grace: Duration,
    counters: Counters,
}

impl FieldSyncEngine {
    /// Create an engine writing through `store`.
    pub fn new(store: Arc<dyn FieldStore>, config: &SyncConfig) -> Self {
        Self {
            store,
            statuses: RwLock::new(config.statuses.clone()),
            preferences: config.preferences.clone(),
            fields: config.fields.clone(),
            locks: Arc::new(ReentrancyLocks::new(config.sync.lock_ttl())),
            echo_grace: config.sync.echo_grace(),
            counters: Counters::default(),
        }
    }

    /// Current status list.
    pub fn statuses(&self) -> Vec<StatusDefinition> {
        self.statuses.read().clone()
    }

    /// Replace the status list and drop every lock taken under the old one.
    pub fn update_statuses(&self, statuses: Vec<StatusDefinition>) -> usize {
        *self.statuses.write() = statuses;
        let cleared = self.locks.clear();
        info!(cleared_locks = cleared, "Status list replaced");
        cleared
    }

    /// Lock set, for inspection.
    pub fn locks(&self) -> &ReentrancyLocks {
        &self.locks
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> SyncStats {
        let c = &self.counters;
        SyncStats {
            events_handled: c.events_handled.load(Ordering::Relaxed),
            writes: c.writes.load(Ordering::Relaxed),
            in_sync: c.in_sync.load(Ordering::Relaxed),
            skipped: c.skipped.load(Ordering::Relaxed),
            echoes_suppressed: c.echoes_suppressed.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
        }
    }

    /// Check `fields` against the invariant without writing.
    pub fn evaluate(&self, id: &ResourceId, fields: &Snapshot) -> SyncResult<Evaluation> {
        let Some(status) = fields.text(&self.fields.status) else {
            return Ok(Evaluation::NoStatus);
        };
        let expected = self.status_is_done(id, status)?;
        let actual = fields.flag(&self.fields.done);
        if actual == Some(expected) {
            Ok(Evaluation::InSync)
        } else {
            Ok(Evaluation::DoneMismatch {
                status: status.to_string(),
                expected,
                actual,
            })
        }
    }

    /// Reconcile one resource on demand, treating the status as the source
    /// of truth.
    pub async fn sync_resource(&self, id: &ResourceId) -> SyncResult<SyncAction> {
        let result = self.sync_from_status(id).await;
        self.record(&result);
        result
    }

    /// Pick the status to use when done becomes `done`.
    ///
    /// Preferred names come first, in preference order; otherwise the first
    /// status with the matching done state in declared order.
    pub fn target_status(&self, id: &ResourceId, done: bool) -> SyncResult<String> {
        let statuses = self.statuses.read();
        let candidates: Vec<&StatusDefinition> =
            statuses.iter().filter(|s| s.is_done == done).collect();

        let preferred = self
            .preferences
            .for_done(done)
            .iter()
            .find(|name| candidates.iter().any(|s| &s.name == *name));
        if let Some(name) = preferred {
            return Ok(name.clone());
        }

        candidates
            .first()
            .map(|s| s.name.clone())
            .ok_or_else(|| SyncError::NoCandidateStatus {
                resource_id: id.clone(),
                done,
            })
    }

    fn status_is_done(&self, id: &ResourceId, status: &str) -> SyncResult<bool> {
        find_status(&self.statuses.read(), status)
            .map(|s| s.is_done)
            .ok_or_else(|| SyncError::UnknownStatus {
                resource_id: id.clone(),
                status: status.to_string(),
            })
    }

    async fn sync_from_status(&self, id: &ResourceId) -> SyncResult<SyncAction> {
        let fields = self.store.read_fields(id).await?;
        match self.evaluate(id, &fields)? {
            Evaluation::NoStatus => Ok(SyncAction::Skipped("no status")),
            Evaluation::InSync => Ok(SyncAction::InSync),
            Evaluation::DoneMismatch {
                status, expected, ..
            } => {
                debug!(resource_id = %id, status = %status, done = expected, "Syncing done from status");
                self.write_locked(
                    id,
                    EventKind::DoneChanged,
                    &self.fields.done,
                    FieldValue::Bool(expected),
                )
                .await
            }
        }
    }

    async fn sync_from_done(&self, id: &ResourceId) -> SyncResult<SyncAction> {
        let fields = self.store.read_fields(id).await?;
        let Some(done) = fields.flag(&self.fields.done) else {
            if fields.text(&self.fields.status).is_none() {
                return Ok(SyncAction::Skipped("no done flag"));
            }
            // A cleared flag is restored from the status.
            return self.sync_from_status(id).await;
        };
        let Some(status) = fields.text(&self.fields.status) else {
            return Ok(SyncAction::Skipped("no status"));
        };
        if self.status_is_done(id, status)? == done {
            return Ok(SyncAction::InSync);
        }

        let target = self.target_status(id, done)?;
        debug!(resource_id = %id, from = %status, to = %target, done, "Syncing status from done");
        self.write_locked(
            id,
            EventKind::StatusChanged,
            &self.fields.status,
            FieldValue::String(target),
        )
        .await
    }

    /// Write `field` while holding the lock for the event kind its change
    /// will come back as.
    async fn write_locked(
        &self,
        id: &ResourceId,
        echo_kind: EventKind,
        field: &str,
        value: FieldValue,
    ) -> SyncResult<SyncAction> {
        let token = self.locks.acquire(id, echo_kind);
        if let Err(e) = self
            .store
            .write_field(id, field, value.clone(), Some(token))
            .await
        {
            self.locks.release(id, echo_kind, token);
            warn!(resource_id = %id, field, "Sync write failed: {}", e);
            return Err(e.into());
        }

        if !self.store.supports_correlation() {
            let locks = Arc::clone(&self.locks);
            let id = id.clone();
            let grace = self.echo_grace;
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                locks.release(&id, echo_kind, token);
            });
        }

        info!(resource_id = %id, field, value = %value, "Synchronized field");
        Ok(SyncAction::Wrote {
            field: field.to_string(),
            value,
        })
    }

    fn record(&self, result: &SyncResult<SyncAction>) {
        let c = &self.counters;
        c.events_handled.fetch_add(1, Ordering::Relaxed);
        let counter = match result {
            Ok(SyncAction::Wrote { .. }) => &c.writes,
            Ok(SyncAction::InSync) => &c.in_sync,
            Ok(SyncAction::Skipped(_)) => &c.skipped,
            Ok(SyncAction::StatusesReplaced { .. }) => return,
            Err(_) => &c.failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Handle one event and report what was done.
    pub async fn apply(&self, event: &Event) -> SyncResult<SyncAction> {
        let result = match &event.payload {
            EventPayload::StatusChanged { resource_id, .. } => {
                self.sync_from_status(resource_id).await
            }
            EventPayload::DoneChanged { resource_id, .. } => self.sync_from_done(resource_id).await,
            EventPayload::SettingsChanged {
                statuses: Some(statuses),
                ..
            } => {
                let cleared_locks = self.update_statuses(statuses.clone());
                return Ok(SyncAction::StatusesReplaced { cleared_locks });
            }
            _ => return Ok(SyncAction::Skipped("not a sync event")),
        };

        if let Ok(SyncAction::Skipped(reason)) = &result {
            debug!(resource_id = ?event.resource_id(), reason, "Sync skipped");
        }
        self.record(&result);
        result
    }
}

#[async_trait]
impl Handler for FieldSyncEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn supported_kinds(&self) -> Vec<EventKind> {
        vec![
            EventKind::StatusChanged,
            EventKind::DoneChanged,
            EventKind::SettingsChanged,
        ]
    }

    fn should_handle(&self, event: &Event) -> bool {
        let kind = event.kind();
        if !matches!(kind, EventKind::StatusChanged | EventKind::DoneChanged) {
            return true;
        }
        let Some(id) = event.resource_id() else {
            return true;
        };

        match self.locks.holder(id, kind) {
            None => true,
            Some(token) if event.origin() == Some(token) => {
                self.locks.release(id, kind, token);
                self.counters
                    .echoes_suppressed
                    .fetch_add(1, Ordering::Relaxed);
                debug!(resource_id = %id, event_kind = %kind, "Suppressed echo of own write");
                false
            }
            Some(_) if self.store.supports_correlation() => true,
            Some(_) => {
                debug!(resource_id = %id, event_kind = %kind, "Skipping event while locked");
                false
            }
        }
    }

    async fn handle(&self, event: &Event) -> anyhow::Result<()> {
        self.apply(event).await?;
        Ok(())
    }
}
