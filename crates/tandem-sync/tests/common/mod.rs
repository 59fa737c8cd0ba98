//! Shared harness for sync integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use tandem_config::{StatusDefinition, SyncConfig};
use tandem_core::events::EventBus;
use tandem_core::{MemoryStore, ResourceId, Snapshot, StorageNotification};
use tandem_sync::FieldSyncEngine;
use tandem_watch::StateWatcher;
use tokio::sync::mpsc;

/// Store, bus, watcher and engine wired together, with notifications
/// delivered by hand so tests control when the system settles.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub bus: EventBus,
    pub watcher: StateWatcher,
    pub engine: Arc<FieldSyncEngine>,
    notifications: mpsc::UnboundedReceiver<StorageNotification>,
}

impl Harness {
    /// Wire components over an already seeded store and initialize the
    /// watcher.
    pub async fn new(store: MemoryStore, config: SyncConfig) -> Self {
        let store = Arc::new(store);
        let notifications = store.subscribe();
        let bus = EventBus::from_config(&config.bus);
        let watcher = StateWatcher::new(
            store.clone(),
            bus.clone(),
            &config.locations,
            config.fields.clone(),
        )
        .unwrap();
        let engine = Arc::new(FieldSyncEngine::new(store.clone(), &config));
        bus.register_handler(engine.clone());
        watcher.initialize().await.unwrap();

        Self {
            store,
            bus,
            watcher,
            engine,
            notifications,
        }
    }

    /// Deliver pending notifications and drain the bus until neither has
    /// anything left. Returns the number of notifications delivered.
    pub async fn settle(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            let mut handled = false;
            while let Ok(notification) = self.notifications.try_recv() {
                handled = true;
                delivered += 1;
                let _ = self.watcher.handle_notification(notification).await;
            }
            self.bus.wait_idle().await;
            if !handled {
                return delivered;
            }
        }
    }

    /// Current fields of a resource.
    pub fn fields(&self, id: &str) -> Snapshot {
        self.store.fields(&ResourceId::from(id)).unwrap()
    }

    /// Apply an external edit.
    pub fn edit(&self, id: &str, changes: Snapshot) {
        self.store.edit(id, changes).unwrap();
    }
}

/// Statuses used by the written scenarios.
pub fn scenario_statuses() -> Vec<StatusDefinition> {
    vec![
        StatusDefinition::new("Backlog", false),
        StatusDefinition::new("In Progress", false),
        StatusDefinition::new("Done", true),
    ]
}

/// Config with the scenario statuses.
pub fn scenario_config() -> SyncConfig {
    SyncConfig::default().with_statuses(scenario_statuses())
}

/// Snapshot with status and done set.
pub fn task(status: &str, done: bool) -> Snapshot {
    Snapshot::new().with("Status", status).with("Done", done)
}
