//! Event types for the Tandem event system.
//!
//! Every event carries a [`EventPayload`] whose variant fixes both the
//! [`EventKind`] and the payload shape, so a kind can never arrive with the
//! wrong fields. Events are categorized by their source:
//!
//! - **Field events**: `StatusChanged`, `DoneChanged` from the state watcher
//! - **Resource lifecycle**: `ResourceCreated`, `ResourceUpdated`,
//!   `ResourceDeleted`, `ResourceRenamed`
//! - **Settings**: `SettingsChanged` for runtime configuration changes
//!
//! # Example
//!
//! ```
//! use tandem_core::events::{Event, EventKind, EventPayload};
//! use tandem_core::{ResourceClass, ResourceId, Snapshot};
//!
//! let event = Event::new(EventPayload::ResourceCreated {
//!     resource_id: ResourceId::from("Tasks/write-docs.md"),
//!     snapshot: Snapshot::new().with("Status", "Todo"),
//!     class: ResourceClass::Task,
//! });
//!
//! assert_eq!(event.kind(), EventKind::ResourceCreated);
//! assert_eq!(event.kind().as_str(), "resource_created");
//! ```

use crate::types::{CorrelationId, ResourceId, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tandem_config::{ResourceClass, StatusDefinition};
use uuid::Uuid;

/// Closed set of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The status field of a resource changed.
    StatusChanged,
    /// The done field of a resource changed.
    DoneChanged,
    /// A tracked resource appeared.
    ResourceCreated,
    /// One or more tracked fields of a resource changed.
    ResourceUpdated,
    /// A tracked resource was removed.
    ResourceDeleted,
    /// A tracked resource moved to a new identifier.
    ResourceRenamed,
    /// Runtime configuration changed.
    SettingsChanged,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 7] = [
        Self::StatusChanged,
        Self::DoneChanged,
        Self::ResourceCreated,
        Self::ResourceUpdated,
        Self::ResourceDeleted,
        Self::ResourceRenamed,
        Self::SettingsChanged,
    ];

    /// Snake-case name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusChanged => "status_changed",
            Self::DoneChanged => "done_changed",
            Self::ResourceCreated => "resource_created",
            Self::ResourceUpdated => "resource_updated",
            Self::ResourceDeleted => "resource_deleted",
            Self::ResourceRenamed => "resource_renamed",
            Self::SettingsChanged => "settings_changed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Status field changed.
    StatusChanged {
        /// Resource that changed.
        resource_id: ResourceId,
        /// Previous status, if any.
        old_status: Option<String>,
        /// New status, `None` when the field was cleared.
        new_status: Option<String>,
        /// Full tracked snapshot after the change.
        snapshot: Snapshot,
        /// Resource classification.
        class: ResourceClass,
        /// Correlation id of the write that caused this change, when known.
        origin: Option<CorrelationId>,
    },

    /// Done field changed.
    DoneChanged {
        /// Resource that changed.
        resource_id: ResourceId,
        /// Previous value, if any.
        old_done: Option<bool>,
        /// New value, `None` when the field was cleared.
        new_done: Option<bool>,
        /// Full tracked snapshot after the change.
        snapshot: Snapshot,
        /// Resource classification.
        class: ResourceClass,
        /// Correlation id of the write that caused this change, when known.
        origin: Option<CorrelationId>,
    },

    /// Resource created.
    ResourceCreated {
        /// New resource.
        resource_id: ResourceId,
        /// Initial snapshot.
        snapshot: Snapshot,
        /// Resource classification.
        class: ResourceClass,
    },

    /// Tracked fields changed.
    ResourceUpdated {
        /// Resource that changed.
        resource_id: ResourceId,
        /// Names of the fields whose values differ from the previous snapshot.
        changed_fields: Vec<String>,
        /// Full tracked snapshot after the change.
        snapshot: Snapshot,
        /// Resource classification.
        class: ResourceClass,
        /// Correlation id of the write that caused this change, when known.
        origin: Option<CorrelationId>,
    },

    /// Resource deleted.
    ResourceDeleted {
        /// Removed resource.
        resource_id: ResourceId,
        /// Last snapshot the watcher held, if it had seen the resource.
        last_snapshot: Option<Snapshot>,
        /// Resource classification.
        class: ResourceClass,
    },

    /// Resource renamed without content change.
    ResourceRenamed {
        /// Previous identifier.
        old_id: ResourceId,
        /// New identifier.
        new_id: ResourceId,
        /// Classification at the new location.
        class: ResourceClass,
    },

    /// Configuration changed at runtime.
    SettingsChanged {
        /// Name of the settings section that changed.
        section: String,
        /// Replacement status list, when the statuses changed.
        statuses: Option<Vec<StatusDefinition>>,
    },
}

impl EventPayload {
    /// Kind of this payload.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StatusChanged { .. } => EventKind::StatusChanged,
            Self::DoneChanged { .. } => EventKind::DoneChanged,
            Self::ResourceCreated { .. } => EventKind::ResourceCreated,
            Self::ResourceUpdated { .. } => EventKind::ResourceUpdated,
            Self::ResourceDeleted { .. } => EventKind::ResourceDeleted,
            Self::ResourceRenamed { .. } => EventKind::ResourceRenamed,
            Self::SettingsChanged { .. } => EventKind::SettingsChanged,
        }
    }

    /// Resource this payload is about, if any.
    ///
    /// Renames report the new identifier.
    pub fn resource_id(&self) -> Option<&ResourceId> {
        match self {
            Self::StatusChanged { resource_id, .. }
            | Self::DoneChanged { resource_id, .. }
            | Self::ResourceCreated { resource_id, .. }
            | Self::ResourceUpdated { resource_id, .. }
            | Self::ResourceDeleted { resource_id, .. } => Some(resource_id),
            Self::ResourceRenamed { new_id, .. } => Some(new_id),
            Self::SettingsChanged { .. } => None,
        }
    }

    /// Correlation id of the write behind this change, if tagged.
    pub fn origin(&self) -> Option<CorrelationId> {
        match self {
            Self::StatusChanged { origin, .. }
            | Self::DoneChanged { origin, .. }
            | Self::ResourceUpdated { origin, .. } => *origin,
            _ => None,
        }
    }

    /// Snapshot carried by the payload, if any.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Self::StatusChanged { snapshot, .. }
            | Self::DoneChanged { snapshot, .. }
            | Self::ResourceCreated { snapshot, .. }
            | Self::ResourceUpdated { snapshot, .. } => Some(snapshot),
            Self::ResourceDeleted { last_snapshot, .. } => last_snapshot.as_ref(),
            Self::ResourceRenamed { .. } | Self::SettingsChanged { .. } => None,
        }
    }
}

/// An event flowing through the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event.
    pub id: Uuid,

    /// When the event was constructed.
    pub timestamp: DateTime<Utc>,

    /// Kind-specific payload.
    pub payload: EventPayload,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Kind of this event.
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Resource this event is about, if any.
    pub fn resource_id(&self) -> Option<&ResourceId> {
        self.payload.resource_id()
    }

    /// Correlation id of the write behind this event, if tagged.
    pub fn origin(&self) -> Option<CorrelationId> {
        self.payload.origin()
    }
}
