//! Per-key async locks.
//!
//! Used to collapse concurrent lookups of the same key into one provider
//! call: the first caller fetches while the rest wait, then find the fresh
//! value in the cache.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A lazily populated map of async mutexes, one per key.
///
/// Entries are dropped again once nobody holds or waits on them, so the map
/// only grows with the number of keys in flight.
pub struct KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    locks: DashMap<K, Arc<AsyncMutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &K) -> KeyedGuard<'_, K> {
        // The shard guard must be released before awaiting.
        let lock = {
            let entry = self
                .locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())));
            Arc::clone(entry.value())
        };

        let guard = lock.lock_owned().await;
        KeyedGuard {
            owner: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to one key; released on drop.
pub struct KeyedGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    owner: &'a KeyedLocks<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> Drop for KeyedGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        self.guard.take();
        // Only the map's own handle left: nobody holds or waits on it.
        self.owner
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
