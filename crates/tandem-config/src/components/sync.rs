//! Sync engine timing

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing for reentrancy locks held around self-triggered writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTimingConfig {
    /// Delay before releasing a lock when the store cannot tag its
    /// notifications with the writer's correlation id.
    #[serde(default = "default_echo_grace_ms")]
    pub echo_grace_ms: u64,

    /// Age after which a lock is treated as stale regardless of echoes.
    #[serde(default = "default_lock_ttl_ms")]
    pub lock_ttl_ms: u64,
}

impl Default for SyncTimingConfig {
    fn default() -> Self {
        Self {
            echo_grace_ms: default_echo_grace_ms(),
            lock_ttl_ms: default_lock_ttl_ms(),
        }
    }
}

impl SyncTimingConfig {
    /// Echo grace delay as a duration.
    pub fn echo_grace(&self) -> Duration {
        Duration::from_millis(self.echo_grace_ms)
    }

    /// Lock time-to-live as a duration.
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }
}

fn default_echo_grace_ms() -> u64 {
    500
}

fn default_lock_ttl_ms() -> u64 {
    10_000
}
