//! The event bus: handler/middleware registry plus ordered dispatch.
//!
//! ```text
//! emit(payload, options)
//!    │
//!    ├── async_dispatch = false ──► process() inline, caller awaits the report
//!    │
//!    └── async_dispatch = true ───► FIFO queue ──► single drain task
//!                                                      │
//!                                                      ▼
//!                                                  process()
//!                                                      │
//!                    middleware 1 ─► middleware 2 ─► … (sequential, may cancel)
//!                                                      │
//!                         ┌────────────┬───────────────┴───┐
//!                         ▼            ▼                   ▼
//!                     handler A    handler B    …      handler N   (concurrent,
//!                                                                   each raced
//!                                                                   against timeout)
//! ```
//!
//! The drain task never overlaps two events: event N's middleware and all of
//! its handlers settle before event N+1 is popped.

use super::event::{Event, EventKind, EventPayload};
use super::handler::{SharedHandler, SharedMiddleware};
use crate::error::{EventError, EventResult};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tandem_config::BusConfig;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default per-handler timeout.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_millis(5000);

/// Options for a single [`EventBus::emit`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    /// Queue for the background drain task instead of dispatching inline.
    pub async_dispatch: bool,
    /// Keep going after a middleware or handler failure.
    pub continue_on_error: bool,
    /// Per-handler timeout.
    pub timeout: Duration,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            async_dispatch: true,
            continue_on_error: true,
            timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }
}

impl EmitOptions {
    /// Options for inline dispatch with default error policy and timeout.
    pub fn sync() -> Self {
        Self {
            async_dispatch: false,
            ..Self::default()
        }
    }

    /// Options taken from configuration.
    pub fn from_config(config: &BusConfig) -> Self {
        Self {
            async_dispatch: config.async_dispatch,
            continue_on_error: config.continue_on_error,
            timeout: config.timeout(),
        }
    }

    /// Set the handler timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the error policy.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Choose queued or inline dispatch.
    pub fn with_async(mut self, async_dispatch: bool) -> Self {
        self.async_dispatch = async_dispatch;
        self
    }
}

/// How one handler invocation settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerStatus {
    /// Returned `Ok`.
    Succeeded,
    /// Returned an error.
    Failed(String),
    /// Did not settle within the timeout; its result is discarded.
    TimedOut,
    /// The handler task panicked.
    Panicked,
}

impl HandlerStatus {
    /// Whether the invocation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Outcome of one handler invocation.
#[derive(Debug, Clone)]
pub struct HandlerReport {
    /// Handler name.
    pub handler: String,
    /// How it settled.
    pub status: HandlerStatus,
    /// Time until it settled (or until the timeout fired).
    pub duration: Duration,
}

impl HandlerReport {
    fn to_error(&self, kind: EventKind, timeout: Duration) -> Option<EventError> {
        let handler = self.handler.clone();
        match &self.status {
            HandlerStatus::Succeeded => None,
            HandlerStatus::Failed(message) => Some(EventError::HandlerFailed {
                handler,
                kind,
                message: message.clone(),
            }),
            HandlerStatus::TimedOut => Some(EventError::HandlerTimeout {
                handler,
                kind,
                timeout_ms: timeout.as_millis() as u64,
            }),
            HandlerStatus::Panicked => Some(EventError::HandlerPanicked { handler, kind }),
        }
    }
}

/// Summary of one inline dispatch.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Event id.
    pub event_id: Uuid,
    /// Kind after middleware.
    pub kind: EventKind,
    /// One entry per invoked handler, in completion order.
    pub handlers: Vec<HandlerReport>,
    /// Handlers whose `should_handle` returned false.
    pub skipped: Vec<String>,
    /// Middleware failures tolerated under `continue_on_error`.
    pub middleware_errors: Vec<EventError>,
}

impl DispatchReport {
    /// Number of handlers invoked.
    pub fn invoked(&self) -> usize {
        self.handlers.len()
    }

    /// Number of handlers that succeeded.
    pub fn succeeded(&self) -> usize {
        self.handlers.iter().filter(|h| h.status.is_success()).count()
    }

    /// Reports of handlers that failed, timed out or panicked.
    pub fn failures(&self) -> impl Iterator<Item = &HandlerReport> {
        self.handlers.iter().filter(|h| !h.status.is_success())
    }

    /// Report for a named handler.
    pub fn handler(&self, name: &str) -> Option<&HandlerReport> {
        self.handlers.iter().find(|h| h.handler == name)
    }
}

/// Result of [`EventBus::emit`].
#[derive(Debug, Clone)]
pub enum EmitOutcome {
    /// Event was queued for the drain task.
    Queued {
        /// Queue depth right after enqueueing.
        depth: usize,
    },
    /// Event was dispatched inline.
    Dispatched(DispatchReport),
    /// A middleware cancelled the event; no handler ran.
    Cancelled {
        /// Kind of the cancelled event.
        kind: EventKind,
        /// Name of the cancelling middleware.
        by: String,
    },
}

impl EmitOutcome {
    /// The dispatch report, for inline dispatch.
    pub fn report(&self) -> Option<&DispatchReport> {
        match self {
            Self::Dispatched(report) => Some(report),
            _ => None,
        }
    }

    /// Whether a middleware cancelled the event.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Whether the event was queued.
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

/// Point-in-time bus statistics.
#[derive(Debug, Clone, Default)]
pub struct BusStats {
    /// Registered handler count per kind.
    pub handlers_per_kind: BTreeMap<EventKind, usize>,
    /// Registered middleware count.
    pub middleware_count: usize,
    /// Events waiting in the queue.
    pub queue_depth: usize,
    /// Whether a drain task is running.
    pub processing: bool,
    /// Events whose dispatch ran to completion.
    pub events_processed: u64,
    /// Handler invocations that failed, timed out or panicked.
    pub handler_failures: u64,
}

struct QueuedEvent {
    event: Event,
    options: EmitOptions,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<QueuedEvent>,
    processing: bool,
    /// A drain task is inside `process` for a popped event.
    dispatching: bool,
    /// Bumped by `clear()` so an idle drain task from before the clear stops
    /// instead of racing a new one.
    generation: u64,
}

struct BusInner {
    handlers: RwLock<BTreeMap<EventKind, Vec<SharedHandler>>>,
    middleware: RwLock<Vec<SharedMiddleware>>,
    queue: Mutex<QueueState>,
    idle: Notify,
    defaults: EmitOptions,
    events_processed: AtomicU64,
    handler_failures: AtomicU64,
}

/// Typed event bus with middleware, ordered async dispatch and per-handler
/// timeouts.
///
/// `EventBus` is a cheap handle; clones share the same registry and queue.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("stats", &self.stats()).finish()
    }
}

impl EventBus {
    /// Create a bus with default emit options.
    pub fn new() -> Self {
        Self::with_defaults(EmitOptions::default())
    }

    /// Create a bus whose [`publish`](Self::publish) uses `defaults`.
    pub fn with_defaults(defaults: EmitOptions) -> Self {
        Self {
            inner: Arc::new(BusInner {
                handlers: RwLock::new(BTreeMap::new()),
                middleware: RwLock::new(Vec::new()),
                queue: Mutex::new(QueueState::default()),
                idle: Notify::new(),
                defaults,
                events_processed: AtomicU64::new(0),
                handler_failures: AtomicU64::new(0),
            }),
        }
    }

    /// Create a bus from configuration.
    pub fn from_config(config: &BusConfig) -> Self {
        Self::with_defaults(EmitOptions::from_config(config))
    }

    /// Default options used by [`publish`](Self::publish).
    pub fn defaults(&self) -> EmitOptions {
        self.inner.defaults
    }

    // ─────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────

    /// Register a handler under every kind it declares.
    ///
    /// Returns the number of kinds it was newly added to; kinds where a
    /// handler with the same name is already present are skipped.
    pub fn register_handler(&self, handler: SharedHandler) -> usize {
        let mut handlers = self.inner.handlers.write();
        let mut added = 0;
        for kind in handler.supported_kinds() {
            let list = handlers.entry(kind).or_default();
            if list.iter().any(|h| h.name() == handler.name()) {
                continue;
            }
            list.push(Arc::clone(&handler));
            added += 1;
        }
        if added > 0 {
            info!(handler = %handler.name(), kinds = added, "Registered event handler");
        }
        added
    }

    /// Remove a handler from every kind. Returns whether anything was removed.
    pub fn unregister_handler(&self, name: &str) -> bool {
        let mut handlers = self.inner.handlers.write();
        let mut removed = false;
        for list in handlers.values_mut() {
            let before = list.len();
            list.retain(|h| h.name() != name);
            removed |= list.len() != before;
        }
        handlers.retain(|_, list| !list.is_empty());
        if removed {
            info!(handler = %name, "Unregistered event handler");
        }
        removed
    }

    /// Append a middleware stage. Returns false if the name is taken.
    pub fn register_middleware(&self, middleware: SharedMiddleware) -> bool {
        let mut stages = self.inner.middleware.write();
        if stages.iter().any(|m| m.name() == middleware.name()) {
            return false;
        }
        info!(middleware = %middleware.name(), position = stages.len(), "Registered middleware");
        stages.push(middleware);
        true
    }

    /// Remove a middleware stage. Returns whether it was present.
    pub fn unregister_middleware(&self, name: &str) -> bool {
        let mut stages = self.inner.middleware.write();
        let before = stages.len();
        stages.retain(|m| m.name() != name);
        stages.len() != before
    }

    // ─────────────────────────────────────────────────────────────────────
    // Emission
    // ─────────────────────────────────────────────────────────────────────

    /// Emit with the bus defaults.
    pub async fn publish(&self, payload: EventPayload) -> EventResult<EmitOutcome> {
        self.emit(payload, self.inner.defaults).await
    }

    /// Construct an event from `payload` and process it.
    ///
    /// With `async_dispatch` the event is queued and this returns at once.
    /// Otherwise it resolves when middleware and every handler have settled;
    /// with `continue_on_error = false` the first failure is returned.
    pub async fn emit(&self, payload: EventPayload, options: EmitOptions) -> EventResult<EmitOutcome> {
        let event = Event::new(payload);
        if options.async_dispatch {
            let depth = self.enqueue(event, options);
            return Ok(EmitOutcome::Queued { depth });
        }
        self.inner.process(event, &options).await
    }

    fn enqueue(&self, event: Event, options: EmitOptions) -> usize {
        let (depth, start) = {
            let mut state = self.inner.queue.lock();
            state.queue.push_back(QueuedEvent { event, options });
            let depth = state.queue.len();
            if state.processing {
                (depth, None)
            } else {
                state.processing = true;
                (depth, Some(state.generation))
            }
        };

        if let Some(generation) = start {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.drain(generation).await });
        }
        depth
    }

    /// Resolve once the queue is empty and no drain task is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            {
                let state = self.inner.queue.lock();
                if !state.processing && state.queue.is_empty() {
                    return;
                }
            }
            notified.await;
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────

    /// Handlers registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.inner.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Kinds with at least one handler.
    pub fn registered_event_kinds(&self) -> Vec<EventKind> {
        self.inner.handlers.read().keys().copied().collect()
    }

    /// Events waiting in the queue.
    pub fn queue_size(&self) -> usize {
        self.inner.queue.lock().queue.len()
    }

    /// Whether a drain task is running.
    pub fn is_processing(&self) -> bool {
        self.inner.queue.lock().processing
    }

    /// Snapshot of bus statistics.
    pub fn stats(&self) -> BusStats {
        let handlers_per_kind = self
            .inner
            .handlers
            .read()
            .iter()
            .map(|(kind, list)| (*kind, list.len()))
            .collect();
        let (queue_depth, processing) = {
            let state = self.inner.queue.lock();
            (state.queue.len(), state.processing)
        };
        BusStats {
            handlers_per_kind,
            middleware_count: self.inner.middleware.read().len(),
            queue_depth,
            processing,
            events_processed: self.inner.events_processed.load(Ordering::Relaxed),
            handler_failures: self.inner.handler_failures.load(Ordering::Relaxed),
        }
    }

    /// Remove every handler, middleware and queued event and reset the
    /// processing state. Meant for teardown.
    ///
    /// A dispatch already in flight keeps its drain task, which finishes the
    /// event and then drains anything emitted after the clear, so dispatches
    /// never overlap. The processing flag drops when that task goes idle.
    pub fn clear(&self) {
        self.inner.handlers.write().clear();
        self.inner.middleware.write().clear();
        let dropped = {
            let mut state = self.inner.queue.lock();
            let dropped = state.queue.len();
            state.queue.clear();
            if !state.dispatching {
                state.processing = false;
                state.generation += 1;
            }
            dropped
        };
        self.inner.idle.notify_waiters();
        info!(dropped_events = dropped, "Event bus cleared");
    }
}

impl BusInner {
    async fn drain(self: Arc<Self>, generation: u64) {
        debug!("Event drain task started");
        loop {
            let next = {
                let mut state = self.queue.lock();
                if state.generation != generation {
                    return;
                }
                state.dispatching = false;
                match state.queue.pop_front() {
                    Some(next) => {
                        state.dispatching = true;
                        next
                    }
                    None => {
                        state.processing = false;
                        drop(state);
                        self.idle.notify_waiters();
                        debug!("Event drain task finished");
                        return;
                    }
                }
            };

            let kind = next.event.kind();
            let event_id = next.event.id;
            let result = AssertUnwindSafe(self.process(next.event, &next.options))
                .catch_unwind()
                .await;
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    error!(event_kind = %kind, %event_id, "Queued event aborted: {}", e);
                }
                Err(_) => {
                    error!(event_kind = %kind, %event_id, "Queued event dispatch panicked");
                }
            }
        }
    }

    async fn process(&self, event: Event, options: &EmitOptions) -> EventResult<EmitOutcome> {
        let event_id = event.id;
        let mut current = event;
        let mut middleware_errors = Vec::new();

        let stages: Vec<SharedMiddleware> = self.middleware.read().clone();
        for stage in stages {
            let kind = current.kind();
            match stage.process(current.clone()).await {
                Ok(Some(next)) => current = next,
                Ok(None) => {
                    debug!(
                        middleware = %stage.name(),
                        event_kind = %kind,
                        %event_id,
                        "Event cancelled by middleware"
                    );
                    return Ok(EmitOutcome::Cancelled {
                        kind,
                        by: stage.name().to_string(),
                    });
                }
                Err(e) => {
                    let err = EventError::MiddlewareFailed {
                        middleware: stage.name().to_string(),
                        kind,
                        message: format!("{:#}", e),
                    };
                    warn!(middleware = %stage.name(), event_kind = %kind, %event_id, "{}", err);
                    if !options.continue_on_error {
                        return Err(err);
                    }
                    middleware_errors.push(err);
                }
            }
        }

        let kind = current.kind();
        let handlers: Vec<SharedHandler> = self
            .handlers
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let event = Arc::new(current);
        let mut skipped = Vec::new();
        let mut pending = FuturesUnordered::new();

        for handler in handlers {
            if !handler.should_handle(&event) {
                debug!(handler = %handler.name(), event_kind = %kind, %event_id, "Handler skipped event");
                skipped.push(handler.name().to_string());
                continue;
            }

            let name = handler.name().to_string();
            let task_event = Arc::clone(&event);
            // Spawned so a timed-out handler keeps running detached instead of
            // being dropped mid-write.
            let task = tokio::spawn(async move { handler.handle(&task_event).await });
            let timeout = options.timeout;

            pending.push(async move {
                let started = Instant::now();
                let status = match tokio::time::timeout(timeout, task).await {
                    Ok(Ok(Ok(()))) => HandlerStatus::Succeeded,
                    Ok(Ok(Err(e))) => HandlerStatus::Failed(format!("{:#}", e)),
                    Ok(Err(_)) => HandlerStatus::Panicked,
                    Err(_) => HandlerStatus::TimedOut,
                };
                HandlerReport {
                    handler: name,
                    status,
                    duration: started.elapsed(),
                }
            });
        }

        let mut reports = Vec::new();
        while let Some(report) = pending.next().await {
            match report.to_error(kind, options.timeout) {
                None => {
                    debug!(
                        handler = %report.handler,
                        event_kind = %kind,
                        "Handler completed in {:?}",
                        report.duration
                    );
                }
                Some(err) => {
                    self.handler_failures.fetch_add(1, Ordering::Relaxed);
                    error!(handler = %report.handler, event_kind = %kind, %event_id, "{}", err);
                    if !options.continue_on_error {
                        return Err(err);
                    }
                }
            }
            reports.push(report);
        }

        self.events_processed.fetch_add(1, Ordering::Relaxed);
        Ok(EmitOutcome::Dispatched(DispatchReport {
            event_id,
            kind,
            handlers: reports,
            skipped,
            middleware_errors,
        }))
    }
}
