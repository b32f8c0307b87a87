//! Per-key mutual exclusion for read-modify-write cycles on shared remote objects.
//!
//! Several independently declared resources can target the same remote object
//! (two `auth0_connection_client` resources enabling different clients on one
//! connection). The Management API only accepts whole-list replacement, so two
//! concurrent cycles on the same connection would lose one of the updates. The
//! [`LockTable`] serialises cycles per key while leaving distinct keys fully
//! parallel.
//!
//! # Design
//!
//! * An outer `std::sync::Mutex<HashMap<..>>` guards key creation only. It is
//!   never held across an `.await`.
//! * Each key owns an `Arc<tokio::sync::Mutex<()>>`. Acquisition awaits this
//!   inner mutex, so waiting never blocks a runtime worker thread.
//! * Entries are created lazily and never removed.
//! * Release happens in [`LockGuard`]'s `Drop`, so every exit path (normal
//!   return, `?`, panic unwinding, the caller's future being dropped) unlocks.
//!
//! # Failure mode
//!
//! There is no timeout. A guard that is never dropped starves every other
//! caller for that key indefinitely, and a task that locks a key it already
//! holds waits on itself forever.
//!
//! # Example Usage
//!
//! ```rust
//! use auth0_provider::lock_table::LockTable;
//!
//! # async fn example() {
//! let locks = LockTable::new();
//! {
//!     let _guard = locks.lock("con_123").await;
//!     // fetch, modify and write the connection here
//! } // released here
//! assert!(locks.try_lock("con_123").is_some());
//! # }
//! ```

use log::trace;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Process-wide registry of per-key async mutexes.
///
/// Clones share the same registry, so a single table can be handed to every
/// resource handler of a provider instance.
#[derive(Clone, Default)]
pub struct LockTable {
    entries: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl LockTable {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free, then hold it until the returned guard is dropped.
    pub async fn lock(&self, key: &str) -> LockGuard {
        let entry = self.entry(key);
        trace!("Waiting for lock '{}'", key);
        let guard = entry.lock_owned().await;
        trace!("Acquired lock '{}'", key);
        LockGuard {
            key: key.to_string(),
            _guard: guard,
        }
    }

    /// Take `key` if nobody holds it right now.
    pub fn try_lock(&self, key: &str) -> Option<LockGuard> {
        let entry = self.entry(key);
        entry.try_lock_owned().ok().map(|guard| LockGuard {
            key: key.to_string(),
            _guard: guard,
        })
    }

    /// Number of keys that have ever been locked.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        // The map only ever gains entries, so a poisoned lock still holds a
        // consistent map.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

impl fmt::Debug for LockTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockTable").field("keys", &self.len()).finish()
    }
}

/// Exclusive hold on one key of a [`LockTable`].
pub struct LockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl LockGuard {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").field("key", &self.key).finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        trace!("Released lock '{}'", self.key);
    }
}
