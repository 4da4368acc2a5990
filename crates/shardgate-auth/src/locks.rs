//! Cooperative per-key mutual exclusion.
//!
//! Register and login both `await` mid-flight (database reads, hash
//! verification), so two requests for the same username can interleave
//! even though handlers never run in parallel on the same state. The
//! fix is an async mutex per `(kind, key)`: only one register and one
//! login may proceed per account key at a time, while different keys
//! stay fully concurrent.
//!
//! Release is RAII — dropping the [`KeyGuard`] releases the key on
//! every path, including early returns and panics mid-handler.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Which operation family a lock scopes.
///
/// Register and login deliberately do not exclude each other: the
/// register path's duplicate check and the login path's cache are
/// independent consistency domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKind {
    Register,
    Login,
}

/// A map of async mutexes keyed by `(LockKind, account key)`.
pub struct KeyedLocks {
    inner: Mutex<HashMap<(LockKind, String), Arc<Mutex<()>>>>,
}

/// RAII permit for one key. Dropping it releases the key.
pub struct KeyGuard {
    _permit: OwnedMutexGuard<()>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the lock for `(kind, key)`, suspending the caller until
    /// the key is free. Fair in arrival order per key (tokio mutex
    /// queueing).
    pub async fn acquire(&self, kind: LockKind, key: &str) -> KeyGuard {
        let slot = {
            let mut map = self.inner.lock().await;
            // Prune idle slots: strong_count == 1 means nobody holds or
            // waits on the mutex, only the map does.
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry((kind, key.to_string()))
                .or_default()
                .clone()
        };
        KeyGuard {
            _permit: slot.lock_owned().await,
        }
    }

    /// Number of keys currently tracked (held, waited on, or not yet
    /// pruned).
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

impl Default for KeyedLocks {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_acquire_same_key_serializes() {
        // Two tasks contend on one key; a counter tracks how many are
        // inside the critical section at once.
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(LockKind::Login, "alice").await;
                let n = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(n, Ordering::SeqCst);
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1, "mutual exclusion broken");
    }

    #[tokio::test]
    async fn test_acquire_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        // Holding "alice" must not block "bob".
        let _alice = locks.acquire(LockKind::Login, "alice").await;
        let _bob = locks.acquire(LockKind::Login, "bob").await;
    }

    #[tokio::test]
    async fn test_acquire_different_kinds_do_not_block() {
        let locks = KeyedLocks::new();
        let _register = locks.acquire(LockKind::Register, "alice").await;
        let _login = locks.acquire(LockKind::Login, "alice").await;
    }

    #[tokio::test]
    async fn test_guard_drop_releases_key() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks.acquire(LockKind::Register, "alice").await;
        }
        // Re-acquiring after drop must not deadlock.
        let _guard = locks.acquire(LockKind::Register, "alice").await;
    }

    #[tokio::test]
    async fn test_idle_slots_are_pruned() {
        let locks = KeyedLocks::new();
        {
            let _a = locks.acquire(LockKind::Login, "alice").await;
        }
        {
            let _b = locks.acquire(LockKind::Login, "bob").await;
        }
        // The next acquire prunes everything idle before inserting.
        let _c = locks.acquire(LockKind::Login, "carol").await;
        assert_eq!(locks.len().await, 1);
    }
}
