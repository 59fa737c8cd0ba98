//! Built-in middleware for common pipeline concerns.
//!
//! # Available Middleware
//!
//! - [`LoggingMiddleware`]: Logs every event (debug level)
//! - [`MetricsMiddleware`]: Counts events per kind
//! - [`FilterMiddleware`]: Conditionally cancels events
//!
//! # Example
//!
//! ```rust,ignore
//! use tandem_core::events::{EventBus, LoggingMiddleware, MetricsMiddleware};
//! use std::sync::Arc;
//!
//! let bus = EventBus::new();
//! bus.register_middleware(Arc::new(LoggingMiddleware::new()));
//! bus.register_middleware(Arc::new(MetricsMiddleware::new()));
//! ```

use super::event::{Event, EventKind};
use super::handler::Middleware;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// LoggingMiddleware - Logs all events
// ============================================================================

/// Middleware that logs every event passing through the bus.
pub struct LoggingMiddleware {
    name: String,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingMiddleware {
    /// Create a new logging middleware.
    pub fn new() -> Self {
        Self {
            name: "builtin:logging".to_string(),
        }
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, event: Event) -> anyhow::Result<Option<Event>> {
        tracing::debug!(
            event_kind = %event.kind(),
            event_id = %event.id,
            resource = ?event.resource_id(),
            origin = ?event.origin(),
            "Event"
        );
        Ok(Some(event))
    }
}

// ============================================================================
// MetricsMiddleware - Counts events
// ============================================================================

/// Middleware that counts events, in total and per kind.
pub struct MetricsMiddleware {
    name: String,
    total: Arc<AtomicU64>,
    per_kind: Arc<Mutex<BTreeMap<EventKind, u64>>>,
}

impl Default for MetricsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsMiddleware {
    /// Create a new metrics middleware.
    pub fn new() -> Self {
        Self {
            name: "builtin:metrics".to_string(),
            total: Arc::new(AtomicU64::new(0)),
            per_kind: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Total events seen.
    pub fn total_events(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Events seen of one kind.
    pub fn events_of(&self, kind: EventKind) -> u64 {
        self.per_kind.lock().get(&kind).copied().unwrap_or(0)
    }

    /// Shared handle to the total counter, for reading after the
    /// middleware has been moved into the bus.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.total)
    }
}

#[async_trait]
impl Middleware for MetricsMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, event: Event) -> anyhow::Result<Option<Event>> {
        self.total.fetch_add(1, Ordering::Relaxed);
        *self.per_kind.lock().entry(event.kind()).or_insert(0) += 1;
        Ok(Some(event))
    }
}

// ============================================================================
// FilterMiddleware - Conditionally cancels events
// ============================================================================

/// Middleware that cancels events matching a predicate.
///
/// The predicate returns `true` to cancel.
pub struct FilterMiddleware<F>
where
    F: Fn(&Event) -> bool + Send + Sync,
{
    name: String,
    should_cancel: F,
}

impl<F> FilterMiddleware<F>
where
    F: Fn(&Event) -> bool + Send + Sync,
{
    /// Create a filter that cancels events for which `should_cancel` is true.
    pub fn new(name: impl Into<String>, should_cancel: F) -> Self {
        Self {
            name: name.into(),
            should_cancel,
        }
    }
}

#[async_trait]
impl<F> Middleware for FilterMiddleware<F>
where
    F: Fn(&Event) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, event: Event) -> anyhow::Result<Option<Event>> {
        if (self.should_cancel)(&event) {
            tracing::debug!(
                filter = %self.name,
                event_kind = %event.kind(),
                "Event cancelled by filter"
            );
            return Ok(None);
        }
        Ok(Some(event))
    }
}
