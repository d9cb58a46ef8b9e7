use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar. Persisted append-only, unique on `(symbol, date)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
}
