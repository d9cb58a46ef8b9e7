//! Freshness-aware read-through cache over a [`CurrentRecordStore`].
//!
//! For every lookup of `(symbol, kind)` it decides whether the persisted
//! record is young enough to serve or whether the provider must be asked.
//! Successful fetches are written through; failed fetches fall back to the
//! last good record (stale-if-error), so a provider outage degrades to
//! slightly stale data rather than to an error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use marketfeed_market_data::{CanonicalRecord, FetchError};

use super::inflight::KeyedLocks;
use super::store::CurrentRecordStore;
use crate::constants::{FUNDAMENTALS_FRESHNESS, QUOTE_FRESHNESS, SEARCH_FRESHNESS};
use crate::errors::Result;

/// Maximum age per record kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub quote: Duration,
    pub fundamentals: Duration,
    /// TTL of the in-process search memo.
    pub search: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            quote: QUOTE_FRESHNESS,
            fundamentals: FUNDAMENTALS_FRESHNESS,
            search: SEARCH_FRESHNESS,
        }
    }
}

/// Read-through cache for one record kind.
pub struct FreshnessCache<T>
where
    T: CanonicalRecord,
{
    store: Arc<dyn CurrentRecordStore<T>>,
    window: Duration,
    inflight: KeyedLocks<String>,
}

impl<T> FreshnessCache<T>
where
    T: CanonicalRecord,
{
    pub fn new(store: Arc<dyn CurrentRecordStore<T>>, window: Duration) -> Self {
        Self {
            store,
            window,
            inflight: KeyedLocks::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True while `now - fetched_at` is strictly below the window.
    pub fn is_fresh(&self, record: &T, now: DateTime<Utc>) -> bool {
        match (now - record.fetched_at()).to_std() {
            Ok(age) => age < self.window,
            // fetched_at in the future (clock skew): treat as just fetched
            Err(_) => true,
        }
    }

    /// How much longer `record` stays fresh; zero once it is stale.
    pub fn remaining(&self, record: &T, now: DateTime<Utc>) -> Duration {
        match (now - record.fetched_at()).to_std() {
            Ok(age) => self.window.saturating_sub(age),
            Err(_) => self.window,
        }
    }

    /// The persisted record, regardless of age.
    pub fn cached(&self, symbol: &str) -> Result<Option<T>> {
        self.store.find_current(symbol)
    }

    /// Write a freshly fetched record. Failures are logged, not returned:
    /// the caller already has the value it asked for.
    pub async fn write_through(&self, record: &T) {
        if let Err(e) = self.store.upsert_current(record.symbol(), record).await {
            warn!(
                "Failed to persist {} for {}: {}",
                T::KIND,
                record.symbol(),
                e
            );
        }
    }

    /// Write a record fetched outside [`get_or_fetch`](Self::get_or_fetch),
    /// waiting for any lookup of the same symbol to finish first so the
    /// newer record is the one left in the store.
    pub async fn store_fetched(&self, record: &T) {
        let _guard = self.inflight.lock(&record.symbol().to_string()).await;
        self.write_through(record).await;
    }

    /// Serve `symbol` from the store when fresh, otherwise call `fetch`.
    ///
    /// * fresh hit (and `force_refresh` false) - stored record, no fetch
    /// * fetch succeeds - record is written through and returned
    /// * fetch fails - the stored record (however old), or `None`
    ///
    /// Only a failing store read is returned as `Err`. Concurrent calls for
    /// the same symbol are serialized so at most one fetch is in flight.
    pub async fn get_or_fetch<F, Fut>(&self, symbol: &str, force_refresh: bool, fetch: F) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, FetchError>>,
    {
        let _guard = self.inflight.lock(&symbol.to_string()).await;

        let cached = self.store.find_current(symbol)?;
        if !force_refresh {
            if let Some(record) = &cached {
                if self.is_fresh(record, Utc::now()) {
                    debug!("Cache hit for {} {}", T::KIND, symbol);
                    return Ok(cached);
                }
            }
        }

        debug!(
            "Cache {} for {} {}, fetching",
            if force_refresh { "bypass" } else { "miss" },
            T::KIND,
            symbol
        );

        match fetch().await {
            Ok(record) => {
                self.write_through(&record).await;
                Ok(Some(record))
            }
            Err(e) => {
                if e.is_no_data() {
                    debug!("No {} data for {}: {}", T::KIND, symbol, e);
                } else {
                    warn!("Refresh of {} for {} failed: {}", T::KIND, symbol, e);
                }
                if cached.is_some() {
                    debug!("Serving stale {} for {}", T::KIND, symbol);
                }
                Ok(cached)
            }
        }
    }
}
