//! Market data provider trait definitions.
//!
//! This module defines the `MarketDataProvider` trait that every upstream
//! adapter implements. Adapters own endpoint knowledge only; admission and
//! retry live in the shared [`RetryingTransport`](crate::transport::RetryingTransport).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::warn;

use crate::errors::FetchError;
use crate::models::{CompanyMetrics, CompanyProfile, NewsItem, PriceBar, Quote, SymbolMatch};
use crate::transport::RateLimitConfig;

use super::capabilities::ProviderCapabilities;

/// Trait for market data providers.
///
/// Every operation has a default that returns [`FetchError::NotSupported`],
/// so an adapter only implements the endpoints its provider offers.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use marketfeed_market_data::provider::{MarketDataProvider, ProviderCapabilities};
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             supports_quotes: true,
///             ..Default::default()
///         }
///     }
///
///     // ... implement get_quote
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider ("FMP", "FINNHUB").
    ///
    /// Also the rate limiter key, so it must be stable.
    fn id(&self) -> &'static str;

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Rate limits to install for this provider when no override is configured.
    fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::default()
    }

    /// Fetch the latest quote for a symbol.
    ///
    /// Returns [`FetchError::NoData`] when the provider does not know the symbol.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let _ = symbol;
        Err(self.not_supported("quote"))
    }

    /// Fetch quotes for many symbols, keyed by upper-cased symbol.
    ///
    /// Symbols that could not be fetched are simply missing from the map;
    /// one failure never aborts the rest. The default issues one
    /// [`get_quote`](Self::get_quote) per symbol.
    async fn get_quotes(&self, symbols: &[String]) -> HashMap<String, Quote> {
        let mut quotes = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            match self.get_quote(symbol).await {
                Ok(quote) => {
                    quotes.insert(quote.symbol.to_uppercase(), quote);
                }
                Err(e) => {
                    warn!(provider = self.id(), symbol = %symbol, error = %e, "Quote fetch failed");
                }
            }
        }
        quotes
    }

    /// Fetch daily bars for `start..=end`, oldest first.
    async fn get_historical(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError> {
        let _ = (symbol, start, end);
        Err(self.not_supported("historical"))
    }

    /// Fetch descriptive company data.
    async fn get_profile(&self, symbol: &str) -> Result<CompanyProfile, FetchError> {
        let _ = symbol;
        Err(self.not_supported("profile"))
    }

    /// Search for symbols matching a free-text query.
    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>, FetchError> {
        let _ = query;
        Err(self.not_supported("search"))
    }

    /// Fetch key ratios for a symbol.
    async fn get_metrics(&self, symbol: &str) -> Result<CompanyMetrics, FetchError> {
        let _ = symbol;
        Err(self.not_supported("metrics"))
    }

    /// Fetch company news published between `from` and `to` (inclusive).
    async fn get_company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsItem>, FetchError> {
        let _ = (symbol, from, to);
        Err(self.not_supported("news"))
    }

    #[doc(hidden)]
    fn not_supported(&self, operation: &str) -> FetchError {
        FetchError::NotSupported {
            operation: operation.to_string(),
            provider: self.id().to_string(),
        }
    }
}
