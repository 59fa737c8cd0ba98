//! Notification sources.

mod notify_backend;

pub use notify_backend::{NotifySource, DEFAULT_DEBOUNCE};
