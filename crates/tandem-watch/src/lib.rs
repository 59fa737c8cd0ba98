//! # Tandem Watch
//!
//! Observes an external store and turns its change notifications into
//! field-level events on a [`tandem_core::EventBus`].
//!
//! ```text
//! ┌────────────────┐   StorageNotification   ┌────────────────┐   EventPayload   ┌──────────┐
//! │  NotifySource  │────────────────────────▶│  StateWatcher  │─────────────────▶│ EventBus │
//! │ (fs, debounce) │                         │ (diff snapshot)│                  │          │
//! └────────────────┘                         └────────────────┘                  └──────────┘
//!                                                    │ read_fields
//!                                                    ▼
//!                                            ┌────────────────┐
//!                                            │ MarkdownStore  │
//!                                            └────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backends;
mod classify;
pub mod error;
pub mod store;
mod watcher;

pub use backends::{NotifySource, DEFAULT_DEBOUNCE};
pub use classify::ResourceClassifier;
pub use error::{WatchError, WatchResult};
pub use store::MarkdownStore;
pub use watcher::StateWatcher;
