//! Configurable handlers for bus tests.

use crate::events::{Event, EventKind, Handler};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Shared, ordered log of `"{handler}:{start|end}:{resource}"` entries.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Handler that records every event it receives.
///
/// Optionally sleeps before finishing, fails with a fixed message, only
/// accepts one resource, and writes start/end entries to a shared
/// [`Journal`] so ordering across handlers can be asserted.
pub struct RecordingHandler {
    name: String,
    kinds: Vec<EventKind>,
    delay: Option<Duration>,
    failure: Option<String>,
    only_for: Option<String>,
    journal: Option<Journal>,
    events: Mutex<Vec<Event>>,
}

impl RecordingHandler {
    /// Create a handler subscribed to `kinds`.
    pub fn new(name: impl Into<String>, kinds: Vec<EventKind>) -> Self {
        Self {
            name: name.into(),
            kinds,
            delay: None,
            failure: None,
            only_for: None,
            journal: None,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Sleep for `delay` inside `handle`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Return an error with `message` from `handle`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Only accept events about `resource_id`.
    pub fn only_for(mut self, resource_id: impl Into<String>) -> Self {
        self.only_for = Some(resource_id.into());
        self
    }

    /// Append start/end entries to `journal`.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Number of events received.
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    fn log(&self, phase: &str, event: &Event) {
        if let Some(journal) = &self.journal {
            let label = event
                .resource_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| event.kind().to_string());
            journal.lock().push(format!("{}:{}:{}", self.name, phase, label));
        }
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_kinds(&self) -> Vec<EventKind> {
        self.kinds.clone()
    }

    fn should_handle(&self, event: &Event) -> bool {
        match &self.only_for {
            Some(wanted) => event.resource_id().is_some_and(|id| id.as_str() == wanted),
            None => true,
        }
    }

    async fn handle(&self, event: &Event) -> anyhow::Result<()> {
        self.events.lock().push(event.clone());
        self.log("start", event);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.log("end", event);
        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}
