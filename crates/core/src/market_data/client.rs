//! Market Data Client - Facade for the market-data crate.
//!
//! Routes each logical operation to the first adapter whose
//! [`ProviderCapabilities`] list it, and composes multi-provider records.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    MarketDataClient                      │
//! │                                                          │
//! │  quote / batch / history / profile / search ─▶ market    │
//! │  metrics / news ───────────────────────────▶ fundamentals│
//! │                                                          │
//! │  fundamentals = metrics (fundamentals) + profile (market)│
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here caches. An operation no provider offers fails with
//! `NotSupported` without any request being sent.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;

use marketfeed_market_data::{
    FetchError, Fundamentals, MarketDataProvider, NewsItem, PriceBar, ProviderCapabilities, Quote, SymbolMatch,
};

struct Routed {
    provider: Arc<dyn MarketDataProvider>,
    capabilities: ProviderCapabilities,
}

pub struct MarketDataClient {
    // preference order: market provider first
    providers: Vec<Routed>,
}

impl MarketDataClient {
    /// # Arguments
    ///
    /// * `market` - preferred for quotes, history, profiles and search (FMP)
    /// * `fundamentals` - preferred for company metrics and news (Finnhub)
    ///
    /// Each operation goes to the first provider whose capabilities list it,
    /// so the two roles only set the order of preference.
    pub fn new(market: Arc<dyn MarketDataProvider>, fundamentals: Arc<dyn MarketDataProvider>) -> Self {
        let providers = [market, fundamentals]
            .into_iter()
            .map(|provider| Routed {
                capabilities: provider.capabilities(),
                provider,
            })
            .collect();
        Self { providers }
    }

    fn route(
        &self,
        operation: &str,
        supports: impl Fn(&ProviderCapabilities) -> bool,
    ) -> Result<&Routed, FetchError> {
        self.providers
            .iter()
            .find(|routed| supports(&routed.capabilities))
            .ok_or_else(|| FetchError::NotSupported {
                operation: operation.to_string(),
                provider: self.provider_ids(),
            })
    }

    fn provider_ids(&self) -> String {
        self.providers
            .iter()
            .map(|routed| routed.provider.id())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Provider serving quotes, if any.
    pub fn market_provider_id(&self) -> Option<&'static str> {
        self.route("quote", |c| c.supports_quotes).ok().map(|r| r.provider.id())
    }

    /// Provider serving company metrics, if any.
    pub fn fundamentals_provider_id(&self) -> Option<&'static str> {
        self.route("metrics", |c| c.supports_metrics).ok().map(|r| r.provider.id())
    }

    pub async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        self.route("quote", |c| c.supports_quotes)?.provider.get_quote(symbol).await
    }

    /// Provider-side batched quotes, keyed by symbol. Missing symbols failed.
    pub async fn fetch_quotes(&self, symbols: &[String]) -> HashMap<String, Quote> {
        match self.route("quote", |c| c.supports_quotes) {
            Ok(routed) => {
                if !routed.capabilities.supports_batch_quotes() {
                    debug!("{} has no batch endpoint, quoting one symbol per call", routed.provider.id());
                }
                routed.provider.get_quotes(symbols).await
            }
            Err(e) => {
                debug!("Batch quote skipped: {}", e);
                HashMap::new()
            }
        }
    }

    pub async fn fetch_historical(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError> {
        self.route("historical", |c| c.supports_historical)?
            .provider
            .get_historical(symbol, start, end)
            .await
    }

    /// Metrics merged with a company profile.
    ///
    /// A missing profile (or no provider offering one) only costs the
    /// descriptive fields; missing metrics fail the whole call.
    pub async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, FetchError> {
        let metrics_provider = &self.route("metrics", |c| c.supports_metrics)?.provider;
        let metrics = metrics_provider.get_metrics(symbol).await?;

        let profile = match self.route("profile", |c| c.supports_profile) {
            Ok(routed) => match routed.provider.get_profile(symbol).await {
                Ok(profile) => Some(profile),
                Err(e) => {
                    debug!("No profile for {} ({}), using symbol as name", symbol, e);
                    None
                }
            },
            Err(_) => None,
        };

        Ok(Fundamentals::compose(metrics, profile, metrics_provider.id()))
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>, FetchError> {
        self.route("search", |c| c.supports_search)?.provider.search(query).await
    }

    pub async fn fetch_company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsItem>, FetchError> {
        self.route("news", |c| c.supports_news)?
            .provider
            .get_company_news(symbol, from, to)
            .await
    }
}
