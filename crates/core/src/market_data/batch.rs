//! Multi-symbol quote resolution.
//!
//! Two paths, chosen by the caller:
//!
//! - **forced**: one provider-side batched fetch (the adapter chunks by its
//!   native batch size), every returned quote written through. Symbols the
//!   provider did not return fall back to their stored quote.
//! - **normal**: every symbol resolved on its own through the
//!   [`FreshnessCache`], so fresh symbols cost no network call.
//!
//! Either way, symbols that end up with nothing are omitted; the output may
//! be shorter than the input but keeps its order.
//!
//! A forced batch does not join a single-symbol lookup already fetching the
//! same symbol: both reach the provider. Its write-through does wait on that
//! lookup's symbol lock, so the batch quote is the one left in the store.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info};

use marketfeed_market_data::Quote;

use super::client::MarketDataClient;
use super::freshness::FreshnessCache;
use crate::constants::QUOTE_LOOKUP_CONCURRENCY;
use crate::errors::Result;

pub struct QuoteBatcher {
    client: Arc<MarketDataClient>,
    quotes: Arc<FreshnessCache<Quote>>,
}

impl QuoteBatcher {
    pub fn new(client: Arc<MarketDataClient>, quotes: Arc<FreshnessCache<Quote>>) -> Self {
        Self { client, quotes }
    }

    /// Resolve already-normalized, de-duplicated symbols.
    pub async fn get_quotes(&self, symbols: &[String], force_refresh: bool) -> Result<Vec<Quote>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        if force_refresh {
            self.refresh_all(symbols).await
        } else {
            self.resolve_each(symbols).await
        }
    }

    async fn refresh_all(&self, symbols: &[String]) -> Result<Vec<Quote>> {
        let mut fetched = self.client.fetch_quotes(symbols).await;
        info!(
            "Batch refresh fetched {}/{} quotes",
            fetched.len(),
            symbols.len()
        );

        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match fetched.remove(symbol) {
                Some(quote) => {
                    self.quotes.store_fetched(&quote).await;
                    quotes.push(quote);
                }
                None => {
                    if let Some(stale) = self.quotes.cached(symbol)? {
                        debug!("Batch refresh missed {}, serving stored quote", symbol);
                        quotes.push(stale);
                    }
                }
            }
        }
        Ok(quotes)
    }

    async fn resolve_each(&self, symbols: &[String]) -> Result<Vec<Quote>> {
        let resolved: Vec<Option<Quote>> = stream::iter(symbols.iter().cloned())
            .map(|symbol| async move {
                self.quotes
                    .get_or_fetch(&symbol, false, || self.client.fetch_quote(&symbol))
                    .await
            })
            .buffered(QUOTE_LOOKUP_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(resolved.into_iter().flatten().collect())
    }
}
