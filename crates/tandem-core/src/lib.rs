//! # Tandem Core
//!
//! Event model and plumbing for the Tandem synchronization core.
//!
//! - [`events`]: typed [`Event`]s, the [`Handler`] and [`Middleware`]
//!   traits and the [`EventBus`] that dispatches between them
//! - [`storage`]: the field-level storage boundary ([`FieldReader`],
//!   [`FieldWriter`], [`StorageNotification`]) and an in-memory store
//! - [`types`]: resource ids, correlation ids and field snapshots
//!
//! [`Event`]: events::Event
//! [`Handler`]: events::Handler
//! [`Middleware`]: events::Middleware
//! [`EventBus`]: events::EventBus
//! [`FieldReader`]: storage::FieldReader
//! [`FieldWriter`]: storage::FieldWriter
//! [`StorageNotification`]: storage::StorageNotification

#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod storage;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use error::{EventError, EventResult, StorageError, StorageResult};
pub use events::{
    EmitOptions, EmitOutcome, Event, EventBus, EventKind, EventPayload, Handler, Middleware,
};
pub use storage::{FieldReader, FieldStore, FieldWriter, MemoryStore, StorageNotification};
pub use types::{CorrelationId, FieldValue, ResourceId, Snapshot};

pub use tandem_config::{ResourceClass, StatusDefinition};
