//! Event bus defaults

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default options applied by `EventBus::publish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Queue events for the background drain task instead of dispatching inline.
    #[serde(default = "default_true")]
    pub async_dispatch: bool,

    /// Keep going after a middleware or handler failure.
    #[serde(default = "default_true")]
    pub continue_on_error: bool,

    /// Per-handler timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Register the logging middleware.
    #[serde(default)]
    pub log_events: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            async_dispatch: true,
            continue_on_error: true,
            timeout_ms: default_timeout_ms(),
            log_events: false,
        }
    }
}

impl BusConfig {
    /// Handler timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    5000
}
