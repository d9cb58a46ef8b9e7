use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest quote for a symbol
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,

    /// Last traded price
    pub price: Decimal,

    /// Absolute change since previous close
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,

    /// Percent change since previous close (1.5 means 1.5%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,

    /// Provider that supplied the quote (FMP, FINNHUB, ...)
    pub source: String,

    pub fetched_at: DateTime<Utc>,
}

impl Quote {
    /// Create a quote with only the required fields
    pub fn new(symbol: impl Into<String>, price: Decimal, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change: None,
            change_percent: None,
            volume: None,
            market_cap: None,
            pe_ratio: None,
            source: source.into(),
            fetched_at: Utc::now(),
        }
    }

    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }
}
