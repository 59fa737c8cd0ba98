//! Wires a store, bus, watcher and engine into one running service.

use crate::engine::{Evaluation, FieldSyncEngine, SyncAction};
use crate::error::{SyncError, SyncResult};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tandem_config::SyncConfig;
use tandem_core::events::{EventBus, EventPayload, LoggingMiddleware};
use tandem_core::{FieldStore, ResourceId, StorageNotification};
use tandem_watch::{StateWatcher, WatchResult};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Outcome of checking or reconciling one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReport {
    /// Resource checked.
    pub resource_id: ResourceId,
    /// What was found.
    pub evaluation: Option<Evaluation>,
    /// Whether a field was written.
    pub written: bool,
    /// Error message, if the resource could not be handled.
    pub error: Option<String>,
}

impl ResourceReport {
    /// Whether the resource needs attention.
    pub fn is_problem(&self) -> bool {
        self.error.is_some() || matches!(self.evaluation, Some(Evaluation::DoneMismatch { .. }))
    }
}

/// Runs the watcher loop and routes its events to the sync engine.
pub struct SyncService {
    store: Arc<dyn FieldStore>,
    config: RwLock<SyncConfig>,
    bus: EventBus,
    watcher: Arc<StateWatcher>,
    engine: Arc<FieldSyncEngine>,
    task: Mutex<Option<JoinHandle<WatchResult<()>>>>,
}

impl SyncService {
    /// Validate `config` and build the components over `store`.
    pub fn new<S>(store: Arc<S>, config: SyncConfig) -> SyncResult<Self>
    where
        S: FieldStore + 'static,
    {
        config.validate()?;

        let bus = EventBus::from_config(&config.bus);
        if config.bus.log_events {
            bus.register_middleware(Arc::new(LoggingMiddleware::new()));
        }

        let watcher = Arc::new(StateWatcher::new(
            store.clone(),
            bus.clone(),
            &config.locations,
            config.fields.clone(),
        )?);
        let engine = Arc::new(FieldSyncEngine::new(store.clone(), &config));
        bus.register_handler(engine.clone());

        Ok(Self {
            store,
            config: RwLock::new(config),
            bus,
            watcher,
            engine,
            task: Mutex::new(None),
        })
    }

    /// Event bus shared by the watcher and the engine.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// State watcher.
    pub fn watcher(&self) -> &Arc<StateWatcher> {
        &self.watcher
    }

    /// Sync engine.
    pub fn engine(&self) -> &Arc<FieldSyncEngine> {
        &self.engine
    }

    /// Current configuration.
    pub fn config(&self) -> SyncConfig {
        self.config.read().clone()
    }

    /// Seed the watcher and start following `notifications`.
    pub async fn start(
        &self,
        notifications: mpsc::UnboundedReceiver<StorageNotification>,
    ) -> SyncResult<usize> {
        if self.task.lock().is_some() {
            warn!("Sync service already running");
            return Ok(self.watcher.tracked_count());
        }

        let seeded = self.watcher.initialize().await?;
        let watcher = Arc::clone(&self.watcher);
        let handle = tokio::spawn(watcher.run(notifications));
        *self.task.lock() = Some(handle);
        info!(tracked = seeded, "Sync service started");
        Ok(seeded)
    }

    /// Whether the watcher loop is running.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Apply a new configuration at runtime.
    ///
    /// Status list changes are published as `SettingsChanged` so the engine
    /// picks them up in event order. Location and field-name changes take
    /// effect on restart.
    pub async fn apply_config(&self, config: SyncConfig) -> SyncResult<()> {
        config.validate()?;

        let previous = self.config();
        if previous.locations != config.locations || previous.fields != config.fields {
            warn!("Location and field changes apply after restart");
        }
        let statuses_changed = previous.statuses != config.statuses;
        let statuses = config.statuses.clone();
        *self.config.write() = config;

        if statuses_changed {
            self.bus
                .publish(EventPayload::SettingsChanged {
                    section: "statuses".into(),
                    statuses: Some(statuses),
                })
                .await?;
        }
        Ok(())
    }

    /// Evaluate every tracked resource without writing.
    pub async fn check_all(&self) -> SyncResult<Vec<ResourceReport>> {
        let mut reports = Vec::new();
        for id in self.tracked_resources().await? {
            let report = match self.store.read_fields(&id).await {
                Ok(fields) => match self.engine.evaluate(&id, &fields) {
                    Ok(evaluation) => ResourceReport {
                        resource_id: id,
                        evaluation: Some(evaluation),
                        written: false,
                        error: None,
                    },
                    Err(e) => Self::failed(id, e),
                },
                Err(e) => Self::failed(id, e.into()),
            };
            reports.push(report);
        }
        Ok(reports)
    }

    /// Reconcile every tracked resource once, status first.
    pub async fn reconcile_all(&self) -> SyncResult<Vec<ResourceReport>> {
        let mut reports = Vec::new();
        for id in self.tracked_resources().await? {
            let report = match self.engine.sync_resource(&id).await {
                Ok(action) => ResourceReport {
                    resource_id: id,
                    evaluation: None,
                    written: matches!(action, SyncAction::Wrote { .. }),
                    error: None,
                },
                Err(e) => {
                    error!(resource_id = %id, "Reconcile failed: {}", e);
                    Self::failed(id, e)
                }
            };
            reports.push(report);
        }
        let written = reports.iter().filter(|r| r.written).count();
        info!(resources = reports.len(), written, "Reconcile complete");
        Ok(reports)
    }

    /// Stop the watcher loop, let queued events finish and clear the bus.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
        self.bus.wait_idle().await;
        self.bus.clear();
        info!("Sync service stopped");
    }

    async fn tracked_resources(&self) -> SyncResult<Vec<ResourceId>> {
        let ids = self.store.list_resources().await?;
        Ok(ids
            .into_iter()
            .filter(|id| self.watcher.classify(id).is_some())
            .collect())
    }

    fn failed(resource_id: ResourceId, error: SyncError) -> ResourceReport {
        ResourceReport {
            resource_id,
            evaluation: None,
            written: false,
            error: Some(error.to_string()),
        }
    }
}
