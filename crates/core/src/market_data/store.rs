//! Market cache storage traits.
//!
//! These traits abstract the persistent read-through cache. The fetch layer
//! treats storage as a key-value store by symbol:
//!
//! - one "current" record per `(symbol, kind)` for quotes and fundamentals
//! - append-only daily bars unique on `(symbol, date)`
//! - append-only news unique on `(symbol, url)`
//!
//! # Design Notes
//!
//! - Reads are sync; they are short indexed lookups on a pooled connection
//! - Writes are async; they go through the single-writer actor
//! - Upserts are last-write-wins; the caller needs no extra locking

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::Result;
use marketfeed_market_data::{CanonicalRecord, NewsItem, PriceBar};

/// Storage for records that have exactly one current value per symbol.
#[async_trait]
pub trait CurrentRecordStore<T>: Send + Sync
where
    T: CanonicalRecord,
{
    /// The current record for `symbol`, whatever its age.
    fn find_current(&self, symbol: &str) -> Result<Option<T>>;

    /// Replace the current record for `symbol`.
    async fn upsert_current(&self, symbol: &str, record: &T) -> Result<()>;
}

/// Storage for daily bars.
#[async_trait]
pub trait PriceBarStore: Send + Sync {
    /// Bars with `start <= date <= end`, oldest first.
    fn find_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>>;

    /// Insert bars, replacing any with the same `(symbol, date)`.
    ///
    /// Returns the number of rows written.
    async fn insert_many(&self, bars: &[PriceBar]) -> Result<usize>;
}

/// Storage for company news.
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Items published in `from..=to`, newest first.
    fn find_news(&self, symbol: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<NewsItem>>;

    /// Insert items, replacing any with the same `(symbol, url)`.
    async fn insert_news(&self, items: &[NewsItem]) -> Result<usize>;
}
