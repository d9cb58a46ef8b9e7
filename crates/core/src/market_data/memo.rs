//! Short-lived in-process result cache.
//!
//! Sits in front of expensive read paths (search, fundamentals) and in front
//! of the persistent cache. Entries expire lazily: an expired entry is only
//! noticed, and replaced, by the next lookup of the same key. Nothing sweeps
//! in the background; `purge_expired` and `clear_all` are explicit.

use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;
use log::debug;
use tokio::time::Instant;

use super::inflight::KeyedLocks;

#[derive(Clone, Debug)]
struct MemoEntry<V> {
    value: V,
    expires_at: Instant,
}

/// TTL memo table keyed by `K`.
///
/// Only successful, present results are stored. `Ok(None)` and errors are
/// handed back without being remembered, so the next call tries again.
/// An entry lives for the table's TTL, or less when the caller bounds it
/// (see [`get_or_compute_bounded`](Self::get_or_compute_bounded)).
pub struct Memoizer<K, V>
where
    K: Eq + Hash + Clone,
{
    name: &'static str,
    ttl: Duration,
    entries: DashMap<K, MemoEntry<V>>,
    inflight: KeyedLocks<K>,
}

impl<K, V> Memoizer<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: DashMap::new(),
            inflight: KeyedLocks::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value for `key` if it is younger than the TTL.
    ///
    /// An expired entry is removed on the way.
    pub fn peek(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if now < entry.expires_at => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| now >= entry.expires_at);
        }
        None
    }

    /// Store `value` under `key` for the full TTL.
    pub fn insert(&self, key: K, value: V) {
        self.insert_for(key, value, self.ttl);
    }

    /// Store `value` for `lifetime`, capped at the TTL. A zero lifetime
    /// drops any existing entry instead.
    pub fn insert_for(&self, key: K, value: V, lifetime: Duration) {
        let lifetime = lifetime.min(self.ttl);
        if lifetime.is_zero() {
            self.entries.remove(&key);
            return;
        }
        self.entries.insert(
            key,
            MemoEntry {
                value,
                expires_at: Instant::now() + lifetime,
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Return the memoized value, or run `compute` and remember a `Some` result.
    ///
    /// Concurrent callers for the same key wait for the first one instead of
    /// computing in parallel.
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        let ttl = self.ttl;
        self.get_or_compute_bounded(key, compute, |_| ttl).await
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but `lifetime` decides
    /// how long the computed value may be served. Values whose lifetime is
    /// zero are returned without being remembered.
    pub async fn get_or_compute_bounded<F, Fut, E, L>(&self, key: K, compute: F, lifetime: L) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
        L: FnOnce(&V) -> Duration,
    {
        if let Some(value) = self.peek(&key) {
            debug!("Memo hit in '{}' for {:?}", self.name, key);
            return Ok(Some(value));
        }

        let _guard = self.inflight.lock(&key).await;
        if let Some(value) = self.peek(&key) {
            debug!("Memo hit in '{}' for {:?} after wait", self.name, key);
            return Ok(Some(value));
        }

        let result = compute().await?;
        if let Some(value) = &result {
            let lifetime = lifetime(value);
            if lifetime.is_zero() {
                debug!("Not memoizing {:?} in '{}': already expired", key, self.name);
            }
            self.insert_for(key, value.clone(), lifetime);
        }
        Ok(result)
    }

    /// Drop every entry.
    pub fn clear_all(&self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!("Memo '{}' cleared ({} entries)", self.name, count);
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.entries.len())
    }

    /// Entries currently stored, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
