//! Financial Modeling Prep (FMP) provider implementation.
//!
//! This module provides market data from the FMP v3 API:
//! - Quotes via /quote/{symbols} (comma-separated, batches of 10)
//! - Daily bars via /historical-price-full/{symbol}
//! - Company profiles via /profile/{symbol}
//! - Symbol search via /search
//!
//! API documentation: https://site.financialmodelingprep.com/developer/docs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::FetchError;
use crate::models::{CompanyProfile, FetchRequest, PriceBar, Quote, RecordKind, SymbolMatch};
use crate::provider::{MarketDataProvider, ProviderCapabilities, ProviderConfig};
use crate::transport::{RateLimitConfig, RetryingTransport};

pub const BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
pub const PROVIDER_ID: &str = "FMP";

/// Maximum symbols per /quote call.
pub const QUOTE_BATCH_SIZE: usize = 10;

const SEARCH_LIMIT: &str = "10";
const AUTH_PARAM: &str = "apikey";

// ============================================================================
// API Response Structures
// ============================================================================

/// Element of the /quote array
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteItem {
    symbol: Option<String>,
    price: Option<f64>,
    change: Option<f64>,
    changes_percentage: Option<f64>,
    volume: Option<f64>,
    market_cap: Option<f64>,
    pe: Option<f64>,
}

/// Response from /historical-price-full/{symbol}.
/// Unknown symbols come back as `{}`.
#[derive(Debug, Deserialize)]
struct HistoricalResponse {
    #[serde(default)]
    historical: Option<Vec<HistoricalItem>>,
}

#[derive(Debug, Deserialize)]
struct HistoricalItem {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<f64>,
}

/// Element of the /profile array
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileItem {
    symbol: Option<String>,
    company_name: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
}

/// Element of the /search array
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    symbol: String,
    name: Option<String>,
    exchange_short_name: Option<String>,
}

// ============================================================================
// Mapping
// ============================================================================

fn decimal(value: f64) -> Option<Decimal> {
    Decimal::try_from(value).ok()
}

fn volume(value: Option<f64>) -> Option<u64> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Map a /quote payload. Entries without a symbol or a usable price are skipped.
fn map_quotes(items: Vec<QuoteItem>) -> Vec<Quote> {
    let fetched_at = Utc::now();
    items
        .into_iter()
        .filter_map(|item| {
            let symbol = item.symbol?.to_uppercase();
            let Some(price) = item.price.and_then(decimal) else {
                debug!(symbol = %symbol, "FMP quote without usable price, skipping");
                return None;
            };
            Some(Quote {
                symbol,
                price,
                change: item.change.and_then(decimal),
                change_percent: item.changes_percentage,
                volume: volume(item.volume),
                market_cap: item.market_cap,
                pe_ratio: item.pe,
                source: PROVIDER_ID.to_string(),
                fetched_at,
            })
        })
        .collect()
}

/// Map a historical payload to bars inside `start..=end`, oldest first.
fn map_bars(symbol: &str, items: Vec<HistoricalItem>, start: NaiveDate, end: NaiveDate) -> Vec<PriceBar> {
    let fetched_at = Utc::now();
    let mut bars: Vec<PriceBar> = items
        .into_iter()
        .filter_map(|item| {
            // Intraday-capable accounts get "YYYY-MM-DD HH:MM:SS".
            let day = item.date.get(..10).unwrap_or(&item.date);
            let date = match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
                Ok(date) => date,
                Err(_) => {
                    warn!(symbol, date = %item.date, "Invalid bar date, skipping");
                    return None;
                }
            };
            if date < start || date > end {
                return None;
            }
            let (Some(open), Some(high), Some(low), Some(close)) = (
                decimal(item.open),
                decimal(item.high),
                decimal(item.low),
                decimal(item.close),
            ) else {
                warn!(symbol, %date, "Invalid bar prices, skipping");
                return None;
            };
            Some(PriceBar {
                symbol: symbol.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume: volume(item.volume),
                source: PROVIDER_ID.to_string(),
                fetched_at,
            })
        })
        .collect();

    bars.sort_by_key(|bar| bar.date);
    bars.dedup_by_key(|bar| bar.date);
    bars
}

// ============================================================================
// FmpProvider
// ============================================================================

/// Financial Modeling Prep provider: quotes, daily history, profiles, search.
pub struct FmpProvider {
    transport: Arc<RetryingTransport>,
    config: ProviderConfig,
}

impl FmpProvider {
    /// Create a provider against the public FMP endpoint.
    pub fn new(transport: Arc<RetryingTransport>, api_key: impl Into<String>) -> Self {
        Self::with_config(transport, ProviderConfig::new(api_key, BASE_URL))
    }

    pub fn with_config(transport: Arc<RetryingTransport>, config: ProviderConfig) -> Self {
        Self { transport, config }
    }

    fn request(&self, operation: RecordKind, path: &str) -> FetchRequest {
        FetchRequest::new(PROVIDER_ID, operation, self.config.url(path))
            .with_auth(AUTH_PARAM, self.config.api_key.clone())
    }

    fn path_symbols(symbols: &[String]) -> String {
        symbols
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// One /quote call for up to [`QUOTE_BATCH_SIZE`] symbols.
    async fn fetch_quote_batch(&self, symbols: &[String]) -> Result<Vec<Quote>, FetchError> {
        let path = format!("/quote/{}", Self::path_symbols(symbols));
        let request = self
            .request(RecordKind::Quote, &path)
            .with_symbols(symbols.iter().cloned());

        let response = self.transport.execute(&request).await?;
        let items: Vec<QuoteItem> = response.json(PROVIDER_ID)?;
        Ok(map_quotes(items))
    }
}

#[async_trait]
impl MarketDataProvider for FmpProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_quotes: true,
            batch_size: QUOTE_BATCH_SIZE,
            supports_historical: true,
            supports_profile: true,
            supports_search: true,
            supports_metrics: false,
            supports_news: false,
        }
    }

    fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::per_minute(30)
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let wanted = symbol.to_uppercase();
        let quotes = self.fetch_quote_batch(&[wanted.clone()]).await?;

        quotes
            .into_iter()
            .find(|q| q.symbol == wanted)
            .ok_or_else(|| FetchError::no_data(PROVIDER_ID, format!("No quote for {}", wanted)))
    }

    async fn get_quotes(&self, symbols: &[String]) -> HashMap<String, Quote> {
        let symbols: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
        let mut merged = HashMap::with_capacity(symbols.len());

        for batch in symbols.chunks(QUOTE_BATCH_SIZE) {
            match self.fetch_quote_batch(batch).await {
                Ok(quotes) => {
                    debug!(requested = batch.len(), received = quotes.len(), "FMP quote batch");
                    merged.extend(quotes.into_iter().map(|q| (q.symbol.clone(), q)));
                }
                Err(e) => {
                    warn!(symbols = ?batch, error = %e, "FMP quote batch failed");
                }
            }
        }

        merged
    }

    async fn get_historical(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError> {
        let symbol = symbol.to_uppercase();
        let path = format!("/historical-price-full/{}", urlencoding::encode(&symbol));
        let request = self
            .request(RecordKind::Historical, &path)
            .with_symbols([symbol.clone()])
            .with_query("from", start.format("%Y-%m-%d").to_string())
            .with_query("to", end.format("%Y-%m-%d").to_string());

        let response = self.transport.execute(&request).await?;
        let payload: HistoricalResponse = response.json(PROVIDER_ID)?;

        let items = payload
            .historical
            .ok_or_else(|| FetchError::no_data(PROVIDER_ID, format!("No history for {}", symbol)))?;

        let bars = map_bars(&symbol, items, start, end);
        if bars.is_empty() {
            return Err(FetchError::no_data(
                PROVIDER_ID,
                format!("No bars for {} between {} and {}", symbol, start, end),
            ));
        }
        Ok(bars)
    }

    async fn get_profile(&self, symbol: &str) -> Result<CompanyProfile, FetchError> {
        let symbol = symbol.to_uppercase();
        let path = format!("/profile/{}", urlencoding::encode(&symbol));
        let request = self
            .request(RecordKind::Fundamentals, &path)
            .with_symbols([symbol.clone()]);

        let response = self.transport.execute(&request).await?;
        let items: Vec<ProfileItem> = response.json(PROVIDER_ID)?;

        let item = items
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::no_data(PROVIDER_ID, format!("No profile for {}", symbol)))?;

        Ok(CompanyProfile {
            symbol: item.symbol.map(|s| s.to_uppercase()).unwrap_or(symbol),
            company_name: blank_to_none(item.company_name),
            sector: blank_to_none(item.sector),
            industry: blank_to_none(item.industry),
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>, FetchError> {
        let request = self
            .request(RecordKind::Search, "/search")
            .with_query("query", query)
            .with_query("limit", SEARCH_LIMIT);

        let response = self.transport.execute(&request).await?;
        let items: Vec<SearchItem> = response.json(PROVIDER_ID)?;

        Ok(items
            .into_iter()
            .map(|item| {
                let name = blank_to_none(item.name).unwrap_or_else(|| item.symbol.clone());
                SymbolMatch {
                    symbol: item.symbol,
                    company_name: name,
                    exchange: blank_to_none(item.exchange_short_name),
                }
            })
            .collect())
    }
}
