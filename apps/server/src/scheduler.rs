//! Background watchlist refresher.
//!
//! Keeps the quote cache warm: every interval it force-refreshes the
//! watchlist through the batched quote path, which writes every returned
//! quote through to storage.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use marketfeed_core::market_data::MarketDataServiceTrait;

pub struct WatchlistRefresher {
    service: Arc<dyn MarketDataServiceTrait>,
    watchlist: Vec<String>,
    every: Duration,
}

impl WatchlistRefresher {
    pub fn new(service: Arc<dyn MarketDataServiceTrait>, watchlist: Vec<String>, every: Duration) -> Self {
        Self {
            service,
            watchlist,
            every,
        }
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// The first refresh happens immediately.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Watchlist refresher started ({} symbols every {:?})",
                self.watchlist.len(),
                self.every
            );

            let mut ticker = interval(self.every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Watchlist refresher stopped");
        })
    }

    /// One refresh cycle; returns how many symbols came back with a quote.
    pub async fn run_once(&self) -> usize {
        if self.watchlist.is_empty() {
            debug!("Watchlist is empty, nothing to refresh");
            return 0;
        }

        match self.service.get_quotes(&self.watchlist, true).await {
            Ok(quotes) => {
                info!("Refreshed {}/{} watchlist quotes", quotes.len(), self.watchlist.len());
                quotes.len()
            }
            Err(e) => {
                warn!("Watchlist refresh failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use marketfeed_core::errors::{Result, ValidationError};
    use marketfeed_core::market_data::{NewsPage, PopularSymbol};
    use marketfeed_market_data::{Fundamentals, NewsItem, PriceBar, Quote, SymbolMatch};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingService {
        calls: AtomicUsize,
        last_refresh_flag: Mutex<Option<bool>>,
        reject: bool,
    }

    #[async_trait]
    impl MarketDataServiceTrait for RecordingService {
        async fn get_quote(&self, _symbol: &str, _refresh: bool) -> Result<Option<Quote>> {
            Ok(None)
        }

        async fn get_quotes(&self, symbols: &[String], refresh: bool) -> Result<Vec<Quote>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_refresh_flag.lock().unwrap() = Some(refresh);
            if self.reject {
                return Err(ValidationError::InvalidInput("bad watchlist".to_string()).into());
            }
            Ok(symbols
                .iter()
                .skip(1)
                .map(|s| Quote::new(s.as_str(), rust_decimal::Decimal::ONE, "TEST"))
                .collect())
        }

        async fn get_historical(&self, _symbol: &str, _start: NaiveDate, _end: NaiveDate) -> Result<Vec<PriceBar>> {
            Ok(Vec::new())
        }

        async fn get_fundamentals(&self, _symbol: &str, _refresh: bool) -> Result<Option<Fundamentals>> {
            Ok(None)
        }

        async fn search(&self, _query: &str) -> Result<Vec<SymbolMatch>> {
            Ok(Vec::new())
        }

        async fn get_company_news(
            &self,
            _symbol: &str,
            _from: Option<NaiveDate>,
            _to: Option<NaiveDate>,
            _page: NewsPage,
            _refresh: bool,
        ) -> Result<Vec<NewsItem>> {
            Ok(Vec::new())
        }

        async fn get_news_for_symbols(&self, _symbols: &[String], _limit: usize) -> Result<Vec<NewsItem>> {
            Ok(Vec::new())
        }

        fn popular_symbols(&self) -> Vec<PopularSymbol> {
            Vec::new()
        }

        fn clear_memoized(&self) {}
    }

    fn watchlist() -> Vec<String> {
        vec!["AAPL".to_string(), "MSFT".to_string(), "NVDA".to_string()]
    }

    #[tokio::test]
    async fn test_run_once_forces_refresh_and_counts() {
        let service = Arc::new(RecordingService::default());
        let refresher = WatchlistRefresher::new(service.clone(), watchlist(), Duration::from_secs(300));

        assert_eq!(refresher.run_once().await, 2);
        assert_eq!(*service.last_refresh_flag.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_run_once_survives_errors_and_empty_watchlist() {
        let service = Arc::new(RecordingService {
            reject: true,
            ..Default::default()
        });
        let refresher = WatchlistRefresher::new(service.clone(), watchlist(), Duration::from_secs(300));
        assert_eq!(refresher.run_once().await, 0);

        let empty = WatchlistRefresher::new(service.clone(), Vec::new(), Duration::from_secs(300));
        assert_eq!(empty.run_once().await, 0);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_each_interval_until_shutdown() {
        let service = Arc::new(RecordingService::default());
        let (tx, rx) = watch::channel(false);
        let handle =
            WatchlistRefresher::new(service.clone(), watchlist(), Duration::from_secs(300)).spawn(rx);

        // immediate first tick, then two more intervals
        tokio::time::sleep(Duration::from_secs(601)).await;
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);

        tx.send(true).unwrap();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
    }
}
