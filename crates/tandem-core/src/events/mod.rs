//! Event system: typed events, handler/middleware traits and the bus.

mod builtin_middleware;
mod bus;
mod event;
mod handler;

pub use builtin_middleware::{FilterMiddleware, LoggingMiddleware, MetricsMiddleware};
pub use bus::{
    BusStats, DispatchReport, EmitOptions, EmitOutcome, EventBus, HandlerReport, HandlerStatus,
    DEFAULT_HANDLER_TIMEOUT,
};
pub use event::{Event, EventKind, EventPayload};
pub use handler::{Handler, Middleware, SharedHandler, SharedMiddleware};
