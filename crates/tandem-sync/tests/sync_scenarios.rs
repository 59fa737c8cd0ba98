//! End-to-end synchronization scenarios over an in-memory store
//!
//! Each test seeds a store, applies external edits and lets the watcher,
//! bus and engine settle before asserting on the final fields and the
//! writes the engine issued.

mod common;

use common::{scenario_config, task, Harness};
use serde_json::json;
use tandem_config::StatusDefinition;
use tandem_core::events::{EmitOptions, EventPayload};
use tandem_core::{MemoryStore, Snapshot};
use tandem_sync::SyncService;

/// Setting Status to a done status writes Done exactly once
#[tokio::test]
async fn test_status_change_drives_done() {
    let store = MemoryStore::new();
    store.insert("Tasks/a.md", task("Backlog", false));
    let mut h = Harness::new(store, scenario_config()).await;

    h.edit("Tasks/a.md", Snapshot::new().with("Status", "Done"));
    h.settle().await;

    assert_eq!(h.fields("Tasks/a.md"), task("Done", true));
    let writes = h.store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].field, "Done");
    assert_eq!(writes[0].value, json!(true));
    assert_eq!(h.engine.stats().echoes_suppressed, 1);
    assert!(h.engine.locks().is_empty());
}

/// Setting Done writes the preferred done status exactly once
#[tokio::test]
async fn test_done_change_drives_status() {
    let store = MemoryStore::new();
    store.insert("Tasks/a.md", task("Backlog", false));
    let mut h = Harness::new(store, scenario_config()).await;

    h.edit("Tasks/a.md", Snapshot::new().with("Done", true));
    h.settle().await;

    assert_eq!(h.fields("Tasks/a.md"), task("Done", true));
    let writes = h.store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].field, "Status");
    assert_eq!(writes[0].value, json!("Done"));
}

/// Reopening a task picks the first preferred not-done status
#[tokio::test]
async fn test_unchecking_done_reopens_task() {
    let store = MemoryStore::new();
    store.insert("Tasks/a.md", task("Done", true));
    let mut h = Harness::new(store, scenario_config()).await;

    h.edit("Tasks/a.md", Snapshot::new().with("Done", false));
    h.settle().await;

    assert_eq!(h.fields("Tasks/a.md"), task("Backlog", false));
    assert_eq!(h.store.write_count(), 1);
}

/// Removing the Done field puts back the value the status implies
#[tokio::test]
async fn test_cleared_done_is_restored() {
    let store = MemoryStore::new();
    store.insert("Tasks/a.md", task("Done", true));
    let mut h = Harness::new(store, scenario_config()).await;

    h.edit("Tasks/a.md", Snapshot::new().with("Done", serde_json::Value::Null));
    h.settle().await;

    assert_eq!(h.fields("Tasks/a.md"), task("Done", true));
    let writes = h.store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].field, "Done");
    assert_eq!(writes[0].value, json!(true));
    assert!(h.engine.locks().is_empty());
}

/// An edit that already satisfies the invariant causes no writes
#[tokio::test]
async fn test_consistent_edit_writes_nothing() {
    let store = MemoryStore::new();
    store.insert("Tasks/a.md", task("Backlog", false));
    let mut h = Harness::new(store, scenario_config()).await;

    h.edit("Tasks/a.md", task("Done", true));
    h.settle().await;

    assert_eq!(h.store.write_count(), 0);
    assert_eq!(h.engine.stats().in_sync, 2);
}

/// When both fields change inconsistently at once, Status wins
#[tokio::test]
async fn test_conflicting_edit_resolves_from_status() {
    let store = MemoryStore::new();
    store.insert("Tasks/a.md", task("Done", true));
    let mut h = Harness::new(store, scenario_config()).await;

    h.edit("Tasks/a.md", task("In Progress", true));
    h.settle().await;

    assert_eq!(h.fields("Tasks/a.md"), task("In Progress", false));
    assert_eq!(h.store.write_count(), 1);
}

/// Without correlation the lock alone suppresses the echo
#[tokio::test]
async fn test_without_correlation_single_write() {
    let store = MemoryStore::without_correlation();
    store.insert("Tasks/a.md", task("Backlog", false));
    let mut h = Harness::new(store, scenario_config()).await;

    h.edit("Tasks/a.md", Snapshot::new().with("Status", "Done"));
    h.settle().await;

    assert_eq!(h.fields("Tasks/a.md"), task("Done", true));
    assert_eq!(h.store.write_count(), 1);
    assert_eq!(h.engine.stats().echoes_suppressed, 0);
}

/// An unknown status is reported and nothing is written
#[tokio::test]
async fn test_unknown_status_is_left_alone() {
    let store = MemoryStore::new();
    store.insert("Tasks/a.md", task("Backlog", false));
    let mut h = Harness::new(store, scenario_config()).await;

    h.edit("Tasks/a.md", Snapshot::new().with("Status", "Someday"));
    h.settle().await;

    assert_eq!(h.fields("Tasks/a.md"), task("Someday", false));
    assert_eq!(h.store.write_count(), 0);
    assert_eq!(h.engine.stats().failures, 1);
    assert_eq!(h.bus.stats().handler_failures, 1);
}

/// Resources outside tracked locations are never synchronized
#[tokio::test]
async fn test_untracked_resource_is_ignored() {
    let store = MemoryStore::new();
    store.insert("Journal/today.md", task("Backlog", false));
    let mut h = Harness::new(store, scenario_config()).await;

    h.edit("Journal/today.md", Snapshot::new().with("Status", "Done"));
    h.settle().await;

    assert_eq!(h.store.write_count(), 0);
}

/// A created resource is not synchronized until its fields change
#[tokio::test]
async fn test_created_resource_then_edit() {
    let store = MemoryStore::new();
    let mut h = Harness::new(store, scenario_config()).await;

    h.store.create("Tasks/new.md", task("Backlog", false));
    h.settle().await;
    assert_eq!(h.watcher.tracked_count(), 1);

    h.edit("Tasks/new.md", Snapshot::new().with("Done", true));
    h.settle().await;
    assert_eq!(h.fields("Tasks/new.md"), task("Done", true));
}

/// A SettingsChanged event swaps the vocabulary for subsequent edits
#[tokio::test]
async fn test_settings_change_applies_new_statuses() {
    let store = MemoryStore::new();
    store.insert("Tasks/a.md", task("Backlog", false));
    let mut h = Harness::new(store, scenario_config()).await;

    h.bus
        .emit(
            EventPayload::SettingsChanged {
                section: "statuses".into(),
                statuses: Some(vec![
                    StatusDefinition::new("Backlog", false),
                    StatusDefinition::new("Shipped", true),
                ]),
            },
            EmitOptions::sync(),
        )
        .await
        .unwrap();

    h.edit("Tasks/a.md", Snapshot::new().with("Done", true));
    h.settle().await;

    assert_eq!(h.fields("Tasks/a.md"), task("Shipped", true));
}

/// The service reconciles pre-existing inconsistencies on demand
#[tokio::test]
async fn test_service_reconcile_all() {
    let store = std::sync::Arc::new(MemoryStore::new());
    store.insert("Tasks/a.md", task("Done", false));
    store.insert("Tasks/b.md", task("Backlog", false));
    store.insert("Tasks/c.md", task("Someday", true));
    store.insert("Notes/d.md", task("Done", false));
    let service = SyncService::new(store.clone(), scenario_config()).unwrap();

    let before = service.check_all().await.unwrap();
    assert_eq!(before.iter().filter(|r| r.is_problem()).count(), 2);

    let reports = service.reconcile_all().await.unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(reports.iter().filter(|r| r.written).count(), 1);
    assert!(reports[2].error.is_some());

    assert_eq!(
        store.fields(&"Tasks/a.md".into()).unwrap(),
        task("Done", true)
    );
    assert_eq!(
        store.fields(&"Notes/d.md".into()).unwrap(),
        task("Done", false)
    );
}

/// The running service converges an edit end to end
#[tokio::test]
async fn test_service_end_to_end() {
    let store = std::sync::Arc::new(MemoryStore::new());
    store.insert("Tasks/a.md", task("Backlog", false));
    let service = SyncService::new(store.clone(), scenario_config()).unwrap();
    let notifications = store.subscribe();
    assert_eq!(service.start(notifications).await.unwrap(), 1);
    assert!(service.is_running());

    store
        .edit("Tasks/a.md", Snapshot::new().with("Status", "Done"))
        .unwrap();

    for _ in 0..200 {
        service.bus().wait_idle().await;
        if store.fields(&"Tasks/a.md".into()).unwrap().flag("Done") == Some(true) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert_eq!(
        store.fields(&"Tasks/a.md".into()).unwrap(),
        task("Done", true)
    );
    service.shutdown().await;
    assert!(!service.is_running());
    assert_eq!(store.write_count(), 1);
}

/// Applying a config with new statuses reaches the engine through the bus
#[tokio::test]
async fn test_service_apply_config() {
    let store = std::sync::Arc::new(MemoryStore::new());
    let service = SyncService::new(store, scenario_config()).unwrap();

    let updated = scenario_config().with_statuses(vec![
        StatusDefinition::new("Open", false),
        StatusDefinition::new("Closed", true),
    ]);
    service.apply_config(updated).await.unwrap();
    service.bus().wait_idle().await;

    assert_eq!(service.engine().statuses().len(), 2);
    assert_eq!(service.config().statuses[1].name, "Closed");

    let invalid = scenario_config().with_statuses(vec![]);
    assert!(service.apply_config(invalid).await.is_err());
}
