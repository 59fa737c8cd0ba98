//! Notify-based notification source for markdown vaults.

use crate::error::{WatchError, WatchResult};
use crate::store::MarkdownStore;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{
    new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer, RecommendedCache,
};
use std::path::Path;
use std::time::Duration;
use tandem_core::StorageNotification;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Debounced filesystem watcher that reports changes to markdown files as
/// [`StorageNotification`]s.
///
/// Watching stops when the source is dropped.
pub struct NotifySource {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    store: MarkdownStore,
}

impl NotifySource {
    /// Start watching the root of `store` recursively.
    pub fn start(
        store: &MarkdownStore,
        debounce: Duration,
    ) -> WatchResult<(Self, mpsc::UnboundedReceiver<StorageNotification>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let converter = store.clone();

        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    for event in events {
                        for notification in convert_event(&converter, &event) {
                            if let Err(e) = tx.send(notification) {
                                error!("Failed to send storage notification: {}", e);
                                return;
                            }
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        error!("Notify error: {:?}", error);
                    }
                }
            }
        })
        .map_err(|e| WatchError::Watch(format!("Failed to create notify watcher: {}", e)))?;

        debouncer
            .watch(store.root(), RecursiveMode::Recursive)
            .map_err(|e| WatchError::Watch(format!("Failed to watch path: {}", e)))?;

        info!(root = %store.root().display(), "Watching vault for changes");
        Ok((
            Self {
                _debouncer: debouncer,
                store: store.clone(),
            },
            rx,
        ))
    }

    /// Watched root.
    pub fn root(&self) -> &Path {
        self.store.root()
    }
}

/// Translate one debounced event into notifications for markdown resources.
pub(crate) fn convert_event(store: &MarkdownStore, event: &DebouncedEvent) -> Vec<StorageNotification> {
    let paths = &event.event.paths;
    let id_at = |index: usize| paths.get(index).and_then(|p| store.resource_id_for(p));

    let notifications = match event.event.kind {
        EventKind::Create(_) => paths
            .iter()
            .filter_map(|p| store.resource_id_for(p))
            .map(|id| StorageNotification::Created { id })
            .collect(),
        EventKind::Remove(_) => paths
            .iter()
            .filter_map(|p| store.resource_id_for(p))
            .map(|id| StorageNotification::Deleted { id })
            .collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match (mode, id_at(0), id_at(1)) {
            (RenameMode::Both, Some(from), Some(to)) => {
                vec![StorageNotification::Renamed { from, to }]
            }
            (RenameMode::Both, None, Some(to)) => vec![StorageNotification::Created { id: to }],
            (RenameMode::Both, Some(from), None) => {
                vec![StorageNotification::Deleted { id: from }]
            }
            (RenameMode::From, Some(id), _) => vec![StorageNotification::Deleted { id }],
            (RenameMode::To, Some(id), _) => vec![StorageNotification::Created { id }],
            (RenameMode::Any | RenameMode::Other, Some(id), _) => {
                let exists = paths.first().is_some_and(|p| p.exists());
                if exists {
                    vec![StorageNotification::Created { id }]
                } else {
                    vec![StorageNotification::Deleted { id }]
                }
            }
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => paths
            .iter()
            .filter_map(|p| store.resource_id_for(p))
            .map(|id| StorageNotification::Modified { id, origin: None })
            .collect(),
        _ => Vec::new(),
    };

    if !notifications.is_empty() {
        debug!(kind = ?event.event.kind, count = notifications.len(), "Converted notify event");
    }
    notifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use notify::Event;
    use std::path::PathBuf;
    use std::time::Instant;

    fn debounced(kind: EventKind, paths: &[&str]) -> DebouncedEvent {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        DebouncedEvent::new(event, Instant::now())
    }

    fn store() -> MarkdownStore {
        MarkdownStore::new("/vault")
    }

    #[test]
    fn test_create_and_remove_map_to_lifecycle() {
        let created = convert_event(
            &store(),
            &debounced(EventKind::Create(CreateKind::File), &["/vault/Tasks/a.md"]),
        );
        assert_eq!(
            created,
            vec![StorageNotification::Created {
                id: "Tasks/a.md".into()
            }]
        );

        let removed = convert_event(
            &store(),
            &debounced(EventKind::Remove(RemoveKind::File), &["/vault/Tasks/a.md"]),
        );
        assert_eq!(
            removed,
            vec![StorageNotification::Deleted {
                id: "Tasks/a.md".into()
            }]
        );
    }

    #[test]
    fn test_data_change_is_untagged_modification() {
        let modified = convert_event(
            &store(),
            &debounced(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/vault/Tasks/a.md"],
            ),
        );
        assert_eq!(
            modified,
            vec![StorageNotification::Modified {
                id: "Tasks/a.md".into(),
                origin: None
            }]
        );
    }

    #[test]
    fn test_rename_both_becomes_renamed() {
        let renamed = convert_event(
            &store(),
            &debounced(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/vault/Tasks/a.md", "/vault/Tasks/b.md"],
            ),
        );
        assert_eq!(
            renamed,
            vec![StorageNotification::Renamed {
                from: "Tasks/a.md".into(),
                to: "Tasks/b.md".into()
            }]
        );
    }

    #[test]
    fn test_rename_from_non_markdown_is_a_creation() {
        let renamed = convert_event(
            &store(),
            &debounced(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/vault/Tasks/.a.md.swp", "/vault/Tasks/a.md"],
            ),
        );
        assert_eq!(
            renamed,
            vec![StorageNotification::Created {
                id: "Tasks/a.md".into()
            }]
        );
    }

    #[test]
    fn test_ignores_metadata_and_foreign_paths() {
        assert!(convert_event(
            &store(),
            &debounced(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                &["/vault/Tasks/a.md"],
            ),
        )
        .is_empty());
        assert!(convert_event(
            &store(),
            &debounced(EventKind::Create(CreateKind::File), &["/elsewhere/a.md"]),
        )
        .is_empty());
        assert!(convert_event(
            &store(),
            &debounced(EventKind::Create(CreateKind::File), &["/vault/.obsidian/a.md"]),
        )
        .is_empty());
    }
}
