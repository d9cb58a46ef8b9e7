use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use super::model::{encode_date, encode_timestamp, CachedRecordDB, NewsItemDB, PriceBarDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::cached_records::dsl as cached_dsl;
use crate::schema::news_items::dsl as news_dsl;
use crate::schema::price_bars::dsl as bars_dsl;
use crate::utils::chunk_rows;
use marketfeed_core::market_data::{CurrentRecordStore, NewsStore, PriceBarStore};
use marketfeed_core::Result;
use marketfeed_market_data::{CanonicalRecord, NewsItem, PriceBar};

/// SQLite-backed market data cache.
///
/// Reads use the pool directly; writes go through the single writer actor.
pub struct MarketCacheRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MarketCacheRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

// =============================================================================
// CurrentRecordStore Implementation
// =============================================================================

#[async_trait]
impl<T> CurrentRecordStore<T> for MarketCacheRepository
where
    T: CanonicalRecord,
{
    fn find_current(&self, symbol: &str) -> Result<Option<T>> {
        let mut conn = get_connection(&self.pool)?;

        let row = cached_dsl::cached_records
            .filter(cached_dsl::symbol.eq(symbol))
            .filter(cached_dsl::kind.eq(T::KIND.as_str()))
            .select(CachedRecordDB::as_select())
            .first::<CachedRecordDB>(&mut conn)
            .optional()
            .into_core()?;

        row.map(|r| r.decode::<T>()).transpose()
    }

    async fn upsert_current(&self, symbol: &str, record: &T) -> Result<()> {
        let row = CachedRecordDB::encode(symbol, record)?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::replace_into(cached_dsl::cached_records)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::QueryFailed)?;
                Ok(())
            })
            .await
    }
}

// =============================================================================
// PriceBarStore Implementation
// =============================================================================

#[async_trait]
impl PriceBarStore for MarketCacheRepository {
    fn find_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = bars_dsl::price_bars
            .filter(bars_dsl::symbol.eq(symbol))
            .filter(bars_dsl::date.ge(encode_date(start)))
            .filter(bars_dsl::date.le(encode_date(end)))
            .order(bars_dsl::date.asc())
            .select(PriceBarDB::as_select())
            .load::<PriceBarDB>(&mut conn)
            .into_core()?;

        rows.into_iter().map(PriceBar::try_from).collect()
    }

    async fn insert_many(&self, bars: &[PriceBar]) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }

        let rows: Vec<PriceBarDB> = bars.iter().map(PriceBarDB::from).collect();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut written = 0;
                for chunk in chunk_rows(&rows, PriceBarDB::COLUMNS) {
                    written += diesel::replace_into(bars_dsl::price_bars)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::QueryFailed)?;
                }
                Ok(written)
            })
            .await
    }
}

// =============================================================================
// NewsStore Implementation
// =============================================================================

#[async_trait]
impl NewsStore for MarketCacheRepository {
    fn find_news(&self, symbol: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<NewsItem>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = news_dsl::news_items
            .filter(news_dsl::symbol.eq(symbol))
            .filter(news_dsl::published_at.ge(encode_timestamp(from)))
            .filter(news_dsl::published_at.le(encode_timestamp(to)))
            .order(news_dsl::published_at.desc())
            .select(NewsItemDB::as_select())
            .load::<NewsItemDB>(&mut conn)
            .into_core()?;

        rows.into_iter().map(NewsItem::try_from).collect()
    }

    async fn insert_news(&self, items: &[NewsItem]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let rows: Vec<NewsItemDB> = items.iter().map(NewsItemDB::from).collect();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut written = 0;
                for chunk in chunk_rows(&rows, NewsItemDB::COLUMNS) {
                    written += diesel::replace_into(news_dsl::news_items)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::QueryFailed)?;
                }
                Ok(written)
            })
            .await
    }
}
