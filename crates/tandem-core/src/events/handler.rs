//! Handler and middleware traits.
//!
//! Handlers subscribe to one or more [`EventKind`]s and run concurrently with
//! each other once an event has passed the middleware pipeline. Middleware
//! runs sequentially before fan-out and may rewrite or cancel the event.
//!
//! # Example
//!
//! ```ignore
//! use tandem_core::events::{Event, EventKind, Handler};
//! use async_trait::async_trait;
//!
//! struct AuditHandler;
//!
//! #[async_trait]
//! impl Handler for AuditHandler {
//!     fn name(&self) -> &str { "audit" }
//!
//!     fn supported_kinds(&self) -> Vec<EventKind> {
//!         vec![EventKind::ResourceDeleted]
//!     }
//!
//!     async fn handle(&self, event: &Event) -> anyhow::Result<()> {
//!         tracing::info!(resource = ?event.resource_id(), "resource deleted");
//!         Ok(())
//!     }
//! }
//! ```

use super::event::{Event, EventKind};
use async_trait::async_trait;
use std::sync::Arc;

/// Subscriber invoked for events of the kinds it declares.
///
/// Handlers are identified by [`name`](Handler::name): registering a second
/// handler with the same name for the same kind is a no-op.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Unique handler name.
    fn name(&self) -> &str;

    /// Kinds this handler subscribes to.
    fn supported_kinds(&self) -> Vec<EventKind>;

    /// Last-moment filter applied just before dispatch.
    fn should_handle(&self, _event: &Event) -> bool {
        true
    }

    /// Handle one event.
    async fn handle(&self, event: &Event) -> anyhow::Result<()>;
}

/// Pipeline stage applied to each event before handler fan-out.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Unique middleware name.
    fn name(&self) -> &str;

    /// Transform the event, or return `Ok(None)` to cancel it.
    async fn process(&self, event: Event) -> anyhow::Result<Option<Event>>;
}

/// Shared handler reference held by the bus.
pub type SharedHandler = Arc<dyn Handler>;

/// Shared middleware reference held by the bus.
pub type SharedMiddleware = Arc<dyn Middleware>;
