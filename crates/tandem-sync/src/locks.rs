//! Reentrancy locks around self-triggered writes.
//!
//! A lock on `(resource, kind)` is taken right before the engine writes a
//! field whose change will come back as an event of `kind`. The lock is
//! released when that echo is recognised by its correlation id, after a
//! grace delay when the store has no correlation channel, or when the write
//! fails. Locks older than the TTL are treated as released.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tandem_core::{CorrelationId, EventKind, ResourceId};

/// A held lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockEntry {
    /// Correlation id of the write the lock guards.
    pub token: CorrelationId,
    /// When the lock was taken.
    pub acquired_at: Instant,
}

/// Set of `(resource, kind)` pairs with a self-triggered write in flight.
#[derive(Debug)]
pub struct ReentrancyLocks {
    entries: Mutex<HashMap<(ResourceId, EventKind), LockEntry>>,
    ttl: Duration,
}

impl ReentrancyLocks {
    /// Create an empty lock set whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Take the lock, replacing any previous holder, and return its token.
    pub fn acquire(&self, id: &ResourceId, kind: EventKind) -> CorrelationId {
        let token = CorrelationId::new();
        self.entries.lock().insert(
            (id.clone(), kind),
            LockEntry {
                token,
                acquired_at: Instant::now(),
            },
        );
        token
    }

    /// Token of the current holder. Expired entries are removed first.
    pub fn holder(&self, id: &ResourceId, kind: EventKind) -> Option<CorrelationId> {
        let mut entries = self.entries.lock();
        let key = (id.clone(), kind);
        match entries.get(&key) {
            Some(entry) if entry.acquired_at.elapsed() >= self.ttl => {
                tracing::debug!(resource_id = %id, event_kind = %kind, "Lock expired");
                entries.remove(&key);
                None
            }
            Some(entry) => Some(entry.token),
            None => None,
        }
    }

    /// Whether `(id, kind)` is locked.
    pub fn is_locked(&self, id: &ResourceId, kind: EventKind) -> bool {
        self.holder(id, kind).is_some()
    }

    /// Release the lock if `token` still holds it.
    ///
    /// A newer lock on the same pair is left alone.
    pub fn release(&self, id: &ResourceId, kind: EventKind, token: CorrelationId) -> bool {
        let mut entries = self.entries.lock();
        let key = (id.clone(), kind);
        if entries.get(&key).is_some_and(|e| e.token == token) {
            entries.remove(&key);
            true
        } else {
            false
        }
    }

    /// Drop every lock. Returns how many were held.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Number of locks held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no lock is held.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_requires_matching_token() {
        let locks = ReentrancyLocks::new(Duration::from_secs(10));
        let id = ResourceId::from("Tasks/a.md");

        let first = locks.acquire(&id, EventKind::DoneChanged);
        let second = locks.acquire(&id, EventKind::DoneChanged);

        assert!(!locks.release(&id, EventKind::DoneChanged, first));
        assert_eq!(locks.holder(&id, EventKind::DoneChanged), Some(second));
        assert!(locks.release(&id, EventKind::DoneChanged, second));
        assert!(!locks.is_locked(&id, EventKind::DoneChanged));
    }

    #[test]
    fn test_locks_are_per_kind() {
        let locks = ReentrancyLocks::new(Duration::from_secs(10));
        let id = ResourceId::from("Tasks/a.md");

        locks.acquire(&id, EventKind::DoneChanged);

        assert!(locks.is_locked(&id, EventKind::DoneChanged));
        assert!(!locks.is_locked(&id, EventKind::StatusChanged));
        assert!(!locks.is_locked(&"Tasks/b.md".into(), EventKind::DoneChanged));
    }

    #[test]
    fn test_expired_lock_is_swept() {
        let locks = ReentrancyLocks::new(Duration::ZERO);
        let id = ResourceId::from("Tasks/a.md");

        locks.acquire(&id, EventKind::StatusChanged);

        assert_eq!(locks.len(), 1);
        assert!(!locks.is_locked(&id, EventKind::StatusChanged));
        assert!(locks.is_empty());
    }

    #[test]
    fn test_clear_reports_count() {
        let locks = ReentrancyLocks::new(Duration::from_secs(10));
        locks.acquire(&"a".into(), EventKind::StatusChanged);
        locks.acquire(&"b".into(), EventKind::DoneChanged);

        assert_eq!(locks.clear(), 2);
        assert!(locks.is_empty());
    }
}
