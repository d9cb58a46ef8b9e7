//! Database models for the market data cache.
//!
//! Timestamps are stored as RFC 3339 text in UTC with second precision
//! (`2024-01-02T15:04:05Z`) so that text comparison orders them correctly.
//! Decimal prices are stored as text to keep full precision.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use marketfeed_core::Result;
use marketfeed_market_data::{CanonicalRecord, NewsItem, PriceBar};

use crate::errors::StorageError;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn encode_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Decode(format!("timestamp '{}': {}", raw, e)).into())
}

fn decode_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| StorageError::Decode(format!("date '{}': {}", raw, e)).into())
}

fn decode_decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| StorageError::Decode(format!("decimal '{}': {}", raw, e)).into())
}

/// The current record of one kind for one symbol, as a JSON payload.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::cached_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CachedRecordDB {
    pub symbol: String,
    pub kind: String,
    pub payload: String,
    pub fetched_at: String,
}

impl CachedRecordDB {
    pub fn encode<T: CanonicalRecord>(symbol: &str, record: &T) -> Result<Self> {
        Ok(Self {
            symbol: symbol.to_string(),
            kind: T::KIND.as_str().to_string(),
            payload: serde_json::to_string(record)?,
            fetched_at: encode_timestamp(record.fetched_at()),
        })
    }

    pub fn decode<T: CanonicalRecord>(&self) -> Result<T> {
        serde_json::from_str(&self.payload).map_err(|e| {
            StorageError::Decode(format!("{} payload for {}: {}", self.kind, self.symbol, e)).into()
        })
    }
}

/// Database model for daily price bars
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::price_bars)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceBarDB {
    pub symbol: String,
    pub date: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: Option<i64>,
    pub source: String,
    pub fetched_at: String,
}

impl PriceBarDB {
    pub const COLUMNS: usize = 9;
}

impl From<&PriceBar> for PriceBarDB {
    fn from(bar: &PriceBar) -> Self {
        Self {
            symbol: bar.symbol.clone(),
            date: encode_date(bar.date),
            open: bar.open.to_string(),
            high: bar.high.to_string(),
            low: bar.low.to_string(),
            close: bar.close.to_string(),
            volume: bar.volume.and_then(|v| i64::try_from(v).ok()),
            source: bar.source.clone(),
            fetched_at: encode_timestamp(bar.fetched_at),
        }
    }
}

impl TryFrom<PriceBarDB> for PriceBar {
    type Error = marketfeed_core::Error;

    fn try_from(row: PriceBarDB) -> Result<Self> {
        Ok(PriceBar {
            date: decode_date(&row.date)?,
            open: decode_decimal(&row.open)?,
            high: decode_decimal(&row.high)?,
            low: decode_decimal(&row.low)?,
            close: decode_decimal(&row.close)?,
            volume: row.volume.and_then(|v| u64::try_from(v).ok()),
            fetched_at: decode_timestamp(&row.fetched_at)?,
            symbol: row.symbol,
            source: row.source,
        })
    }
}

/// Database model for news headlines
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::news_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NewsItemDB {
    pub symbol: String,
    pub url: String,
    pub published_at: String,
    pub headline: String,
    pub summary: String,
    pub source: String,
    pub image: Option<String>,
    pub fetched_at: String,
}

impl NewsItemDB {
    pub const COLUMNS: usize = 8;
}

impl From<&NewsItem> for NewsItemDB {
    fn from(item: &NewsItem) -> Self {
        Self {
            symbol: item.symbol.clone(),
            url: item.url.clone(),
            published_at: encode_timestamp(item.published_at),
            headline: item.headline.clone(),
            summary: item.summary.clone(),
            source: item.source.clone(),
            image: item.image.clone(),
            fetched_at: encode_timestamp(item.fetched_at),
        }
    }
}

impl TryFrom<NewsItemDB> for NewsItem {
    type Error = marketfeed_core::Error;

    fn try_from(row: NewsItemDB) -> Result<Self> {
        Ok(NewsItem {
            published_at: decode_timestamp(&row.published_at)?,
            fetched_at: decode_timestamp(&row.fetched_at)?,
            symbol: row.symbol,
            headline: row.headline,
            summary: row.summary,
            source: row.source,
            url: row.url,
            image: row.image,
        })
    }
}
