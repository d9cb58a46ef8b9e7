//! Finnhub provider implementation.
//!
//! This module provides fundamentals and news from the Finnhub API:
//! - Key ratios via /stock/metric?metric=all
//! - Company headlines via /company-news
//!
//! Finnhub free tier is limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::FetchError;
use crate::models::{CompanyMetrics, FetchRequest, NewsItem, RecordKind};
use crate::provider::{MarketDataProvider, ProviderCapabilities, ProviderConfig};
use crate::transport::{RateLimitConfig, RetryingTransport};

pub const BASE_URL: &str = "https://finnhub.io/api/v1";
pub const PROVIDER_ID: &str = "FINNHUB";

/// Headlines kept per news call.
pub const MAX_NEWS_ITEMS: usize = 20;

const AUTH_PARAM: &str = "token";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /stock/metric. The metric map has a few hundred keys whose
/// values are numbers or null, so it is kept loosely typed.
#[derive(Debug, Deserialize)]
struct MetricResponse {
    #[serde(default)]
    metric: Option<HashMap<String, Value>>,
}

/// Element of the /company-news array
#[derive(Debug, Deserialize)]
struct NewsResponseItem {
    /// Publication time (Unix seconds)
    #[serde(default)]
    datetime: i64,
    #[serde(default)]
    headline: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    image: Option<String>,
}

// ============================================================================
// Mapping
// ============================================================================

fn number(metric: &HashMap<String, Value>, key: &str) -> Option<f64> {
    metric.get(key).and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn map_metrics(symbol: &str, metric: &HashMap<String, Value>) -> CompanyMetrics {
    CompanyMetrics {
        symbol: symbol.to_string(),
        // Finnhub reports market cap in millions
        market_cap: number(metric, "marketCapitalization").map(|mc| mc * 1_000_000.0),
        pe_ratio: number(metric, "pe").or_else(|| number(metric, "peTTM")),
        eps: number(metric, "epsBasicExclExtraItemsTTM"),
        dividend_yield: number(metric, "dividendYieldIndicatedAnnual"),
        revenue_per_share: number(metric, "revenuePerShareTTM"),
        revenue_growth: number(metric, "revenueGrowthTTM"),
        profit_margin: number(metric, "netProfitMarginTTM"),
        debt_to_equity: number(metric, "totalDebt/totalEquityAnnual"),
        price_to_book: number(metric, "priceToBookMRQ"),
        rsi: number(metric, "rsi14"),
        beta: number(metric, "beta"),
        fifty_day_ma: number(metric, "day50MovingAvg"),
        two_hundred_day_ma: number(metric, "day200MovingAvg"),
    }
}

/// Map headlines newest-first, dropping items without a headline or URL.
fn map_news(symbol: &str, items: Vec<NewsResponseItem>) -> Vec<NewsItem> {
    let fetched_at = Utc::now();
    let mut news: Vec<NewsItem> = items
        .into_iter()
        .filter_map(|item| {
            if item.headline.trim().is_empty() || item.url.trim().is_empty() {
                return None;
            }
            let Some(published_at) = Utc.timestamp_opt(item.datetime, 0).single() else {
                warn!(symbol, datetime = item.datetime, "Invalid news timestamp, skipping");
                return None;
            };
            Some(NewsItem {
                symbol: symbol.to_string(),
                published_at,
                headline: item.headline,
                summary: item.summary,
                source: item.source,
                url: item.url,
                image: item.image.filter(|i| !i.is_empty()),
                fetched_at,
            })
        })
        .collect();

    news.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    news.truncate(MAX_NEWS_ITEMS);
    news
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub provider: company metrics and company news.
pub struct FinnhubProvider {
    transport: Arc<RetryingTransport>,
    config: ProviderConfig,
}

impl FinnhubProvider {
    /// Create a provider against the public Finnhub endpoint.
    pub fn new(transport: Arc<RetryingTransport>, api_key: impl Into<String>) -> Self {
        Self::with_config(transport, ProviderConfig::new(api_key, BASE_URL))
    }

    pub fn with_config(transport: Arc<RetryingTransport>, config: ProviderConfig) -> Self {
        Self { transport, config }
    }

    fn request(&self, operation: RecordKind, path: &str, symbol: &str) -> FetchRequest {
        FetchRequest::new(PROVIDER_ID, operation, self.config.url(path))
            .with_symbols([symbol])
            .with_query("symbol", symbol)
            .with_auth(AUTH_PARAM, self.config.api_key.clone())
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_metrics: true,
            supports_news: true,
            ..Default::default()
        }
    }

    fn rate_limit(&self) -> RateLimitConfig {
        // Free tier limit
        RateLimitConfig::per_minute(60)
    }

    async fn get_metrics(&self, symbol: &str) -> Result<CompanyMetrics, FetchError> {
        let symbol = symbol.to_uppercase();
        let request = self
            .request(RecordKind::Fundamentals, "/stock/metric", &symbol)
            .with_query("metric", "all");

        let response = self.transport.execute(&request).await?;
        let payload: MetricResponse = response.json(PROVIDER_ID)?;

        match payload.metric {
            Some(metric) if !metric.is_empty() => {
                debug!(symbol = %symbol, keys = metric.len(), "Finnhub metrics received");
                Ok(map_metrics(&symbol, &metric))
            }
            _ => Err(FetchError::no_data(
                PROVIDER_ID,
                format!("No metrics for {}", symbol),
            )),
        }
    }

    async fn get_company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsItem>, FetchError> {
        let symbol = symbol.to_uppercase();
        let request = self
            .request(RecordKind::News, "/company-news", &symbol)
            .with_query("from", from.format("%Y-%m-%d").to_string())
            .with_query("to", to.format("%Y-%m-%d").to_string());

        let response = self.transport.execute(&request).await?;
        let items: Vec<NewsResponseItem> = response.json(PROVIDER_ID)?;

        let news = map_news(&symbol, items);
        debug!(symbol = %symbol, count = news.len(), "Finnhub news received");
        Ok(news)
    }
}

// ============================================================================
// Tests
// ============================================================================
