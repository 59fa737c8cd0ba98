//! # Tandem Sync
//!
//! Bidirectional `Status`/`Done` synchronization on top of the Tandem event
//! bus and state watcher.
//!
//! - [`FieldSyncEngine`]: a bus handler that answers a change to one field
//!   with at most one write to the other, guarded by [`ReentrancyLocks`]
//! - [`SyncService`]: builds the store, bus, watcher and engine from a
//!   [`tandem_config::SyncConfig`] and runs them

#![warn(missing_docs)]
#![warn(clippy::all)]

mod engine;
mod error;
mod locks;
mod service;

pub use engine::{Evaluation, FieldSyncEngine, SyncAction, SyncStats, ENGINE_NAME};
pub use error::{SyncError, SyncResult};
pub use locks::{LockEntry, ReentrancyLocks};
pub use service::{ResourceReport, SyncService};
