//! Caller-facing market data service.
//!
//! Combines the two cache tiers with the provider client:
//!
//! ```text
//! caller ─▶ MarketDataService ─▶ Memoizer (search, fundamentals)
//!                  │
//!                  ├─▶ QuoteBatcher ─▶ FreshnessCache<Quote> ─┐
//!                  ├─▶ FreshnessCache<Fundamentals> ──────────┤─▶ MarketDataClient
//!                  └─▶ bar / news stores ("any item in range") ┘
//! ```
//!
//! Provider trouble never surfaces as `Err`: callers get the last stored
//! value, or nothing. `Err` means bad input or a failing store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, warn};

use marketfeed_market_data::{Fundamentals, NewsItem, PriceBar, Quote, SymbolMatch};

use super::batch::QuoteBatcher;
use super::client::MarketDataClient;
use super::freshness::{FreshnessCache, FreshnessPolicy};
use super::inflight::KeyedLocks;
use super::memo::Memoizer;
use super::store::{CurrentRecordStore, NewsStore, PriceBarStore};
use super::symbols::{normalize_query, normalize_symbol, normalize_symbols, popular_symbols, PopularSymbol};
use crate::constants::{DEFAULT_NEWS_LIMIT, DEFAULT_NEWS_LOOKBACK_DAYS, NEWS_LOOKUP_CONCURRENCY};
use crate::errors::{Error, Result, ValidationError};

/// A window over stored news, newest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewsPage {
    pub limit: usize,
    pub offset: usize,
}

impl NewsPage {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    fn apply(self, items: Vec<NewsItem>) -> Vec<NewsItem> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

impl Default for NewsPage {
    fn default() -> Self {
        Self::new(DEFAULT_NEWS_LIMIT, 0)
    }
}

/// Persistence collaborators, one per record family.
#[derive(Clone)]
pub struct MarketDataStores {
    pub quotes: Arc<dyn CurrentRecordStore<Quote>>,
    pub fundamentals: Arc<dyn CurrentRecordStore<Fundamentals>>,
    pub bars: Arc<dyn PriceBarStore>,
    pub news: Arc<dyn NewsStore>,
}

/// Trait for the market data operations exposed to the route layer.
#[async_trait]
pub trait MarketDataServiceTrait: Send + Sync {
    /// Latest quote, served from cache while younger than the quote window.
    async fn get_quote(&self, symbol: &str, refresh: bool) -> Result<Option<Quote>>;

    /// Quotes for many symbols. Symbols with no data are omitted, so the
    /// result may be shorter than the input.
    async fn get_quotes(&self, symbols: &[String], refresh: bool) -> Result<Vec<Quote>>;

    /// Daily bars for `start..=end`, oldest first.
    ///
    /// Any stored bar in the range counts as a hit; gaps inside a stored
    /// range are not detected.
    async fn get_historical(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>>;

    /// Metrics plus company profile, memoized in process and persisted.
    ///
    /// A memo entry never outlives the record's freshness window, so a
    /// stale fallback is served only while refreshes keep failing.
    async fn get_fundamentals(&self, symbol: &str, refresh: bool) -> Result<Option<Fundamentals>>;

    /// Symbol search, memoized per normalized query.
    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>>;

    /// Company news, newest first, paged by `page`. Defaults to the last
    /// seven days. `refresh` skips the stored items and refetches the range.
    async fn get_company_news(
        &self,
        symbol: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        page: NewsPage,
        refresh: bool,
    ) -> Result<Vec<NewsItem>>;

    /// Recent news for several symbols, `limit_per_symbol` each, newest first overall.
    async fn get_news_for_symbols(&self, symbols: &[String], limit_per_symbol: usize) -> Result<Vec<NewsItem>>;

    /// Fixed list of widely followed tickers.
    fn popular_symbols(&self) -> Vec<PopularSymbol>;

    /// Drop every memoized search and fundamentals result.
    fn clear_memoized(&self);
}

pub struct MarketDataService {
    client: Arc<MarketDataClient>,
    quotes: Arc<FreshnessCache<Quote>>,
    fundamentals: FreshnessCache<Fundamentals>,
    bars: Arc<dyn PriceBarStore>,
    news: Arc<dyn NewsStore>,
    batcher: QuoteBatcher,
    search_memo: Memoizer<String, Vec<SymbolMatch>>,
    fundamentals_memo: Memoizer<String, Fundamentals>,
    history_inflight: KeyedLocks<String>,
    news_inflight: KeyedLocks<String>,
}

impl MarketDataService {
    pub fn new(client: Arc<MarketDataClient>, stores: MarketDataStores, policy: FreshnessPolicy) -> Self {
        let quotes = Arc::new(FreshnessCache::new(stores.quotes, policy.quote));
        let batcher = QuoteBatcher::new(Arc::clone(&client), Arc::clone(&quotes));

        Self {
            fundamentals: FreshnessCache::new(stores.fundamentals, policy.fundamentals),
            bars: stores.bars,
            news: stores.news,
            batcher,
            search_memo: Memoizer::new("search", policy.search),
            fundamentals_memo: Memoizer::new("fundamentals", policy.fundamentals),
            history_inflight: KeyedLocks::new(),
            news_inflight: KeyedLocks::new(),
            quotes,
            client,
        }
    }

    /// Drop expired memo entries; returns how many were removed.
    pub fn purge_expired_memos(&self) -> usize {
        self.search_memo.purge_expired() + self.fundamentals_memo.purge_expired()
    }

    /// Entries held by the (search, fundamentals) memo tables.
    pub fn memo_sizes(&self) -> (usize, usize) {
        (self.search_memo.len(), self.fundamentals_memo.len())
    }

    fn check_range<T: std::fmt::Display + PartialOrd>(start: T, end: T) -> Result<()> {
        if start > end {
            return Err(Error::Validation(ValidationError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            }));
        }
        Ok(())
    }

    fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
        date.and_time(NaiveTime::MIN).and_utc()
    }

    fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
        Self::start_of_day(date) + ChronoDuration::days(1) - ChronoDuration::seconds(1)
    }
}

#[async_trait]
impl MarketDataServiceTrait for MarketDataService {
    async fn get_quote(&self, symbol: &str, refresh: bool) -> Result<Option<Quote>> {
        let symbol = normalize_symbol(symbol)?;
        self.quotes
            .get_or_fetch(&symbol, refresh, || self.client.fetch_quote(&symbol))
            .await
    }

    async fn get_quotes(&self, symbols: &[String], refresh: bool) -> Result<Vec<Quote>> {
        let symbols = normalize_symbols(symbols)?;
        self.batcher.get_quotes(&symbols, refresh).await
    }

    async fn get_historical(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        let symbol = normalize_symbol(symbol)?;
        Self::check_range(start, end)?;

        let _guard = self.history_inflight.lock(&symbol).await;

        let stored = self.bars.find_range(&symbol, start, end)?;
        if !stored.is_empty() {
            debug!(
                "Serving {} stored bars for {} ({} to {})",
                stored.len(),
                symbol,
                start,
                end
            );
            return Ok(stored);
        }

        match self.client.fetch_historical(&symbol, start, end).await {
            Ok(bars) => {
                if let Err(e) = self.bars.insert_many(&bars).await {
                    warn!("Failed to persist bars for {}: {}", symbol, e);
                }
                Ok(bars)
            }
            Err(e) => {
                if e.is_no_data() {
                    debug!("No history for {} ({} to {})", symbol, start, end);
                } else {
                    warn!("History fetch for {} failed: {}", symbol, e);
                }
                Ok(stored)
            }
        }
    }

    async fn get_fundamentals(&self, symbol: &str, refresh: bool) -> Result<Option<Fundamentals>> {
        let symbol = normalize_symbol(symbol)?;

        if refresh {
            let fundamentals = self
                .fundamentals
                .get_or_fetch(&symbol, true, || self.client.fetch_fundamentals(&symbol))
                .await?;
            match &fundamentals {
                Some(f) => {
                    let lifetime = self.fundamentals.remaining(f, Utc::now());
                    self.fundamentals_memo.insert_for(symbol.clone(), f.clone(), lifetime);
                }
                None => self.fundamentals_memo.invalidate(&symbol),
            }
            return Ok(fundamentals);
        }

        self.fundamentals_memo
            .get_or_compute_bounded(
                symbol.clone(),
                || {
                    self.fundamentals
                        .get_or_fetch(&symbol, false, || self.client.fetch_fundamentals(&symbol))
                },
                |f| self.fundamentals.remaining(f, Utc::now()),
            )
            .await
    }

    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        let Some(key) = normalize_query(query) else {
            return Ok(Vec::new());
        };
        let query = query.trim();

        let matches = self
            .search_memo
            .get_or_compute(key, || async {
                match self.client.search(query).await {
                    Ok(matches) => Ok::<_, Error>(Some(matches)),
                    Err(e) => {
                        warn!("Search for '{}' failed: {}", query, e);
                        Ok(None)
                    }
                }
            })
            .await?;

        Ok(matches.unwrap_or_default())
    }

    async fn get_company_news(
        &self,
        symbol: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        page: NewsPage,
        refresh: bool,
    ) -> Result<Vec<NewsItem>> {
        let symbol = normalize_symbol(symbol)?;
        let to = to.unwrap_or_else(|| Utc::now().date_naive());
        let from = from.unwrap_or_else(|| to - ChronoDuration::days(DEFAULT_NEWS_LOOKBACK_DAYS));
        Self::check_range(from, to)?;
        let (start, end) = (Self::start_of_day(from), Self::end_of_day(to));

        let _guard = self.news_inflight.lock(&symbol).await;

        if !refresh {
            let stored = self.news.find_news(&symbol, start, end)?;
            if !stored.is_empty() {
                debug!("Serving {} stored news items for {}", stored.len(), symbol);
                return Ok(page.apply(stored));
            }
        }

        match self.client.fetch_company_news(&symbol, from, to).await {
            Ok(mut items) => {
                if !items.is_empty() {
                    if let Err(e) = self.news.insert_news(&items).await {
                        warn!("Failed to persist news for {}: {}", symbol, e);
                        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
                        return Ok(page.apply(items));
                    }
                }
            }
            Err(e) => warn!("News fetch for {} failed: {}", symbol, e),
        }

        // page over the store so earlier items count toward the offset
        Ok(page.apply(self.news.find_news(&symbol, start, end)?))
    }

    async fn get_news_for_symbols(&self, symbols: &[String], limit_per_symbol: usize) -> Result<Vec<NewsItem>> {
        let symbols = normalize_symbols(symbols)?;
        let page = NewsPage::new(limit_per_symbol, 0);

        let per_symbol: Vec<Vec<NewsItem>> = stream::iter(symbols)
            .map(|symbol| async move { self.get_company_news(&symbol, None, None, page, false).await })
            .buffer_unordered(NEWS_LOOKUP_CONCURRENCY)
            .try_collect()
            .await?;

        let mut merged: Vec<NewsItem> = per_symbol.into_iter().flatten().collect();
        merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(merged)
    }

    fn popular_symbols(&self) -> Vec<PopularSymbol> {
        popular_symbols()
    }

    fn clear_memoized(&self) {
        self.search_memo.clear_all();
        self.fundamentals_memo.clear_all();
    }
}
