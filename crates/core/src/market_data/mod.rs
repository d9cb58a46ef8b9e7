//! Market data module - cached access to quotes, history, fundamentals and news.
//!
//! Layers, outermost first:
//!
//! - [`MarketDataService`]: validation, memoization and per-kind cache policy
//! - [`FreshnessCache`] / [`QuoteBatcher`]: persisted read-through caching
//! - [`MarketDataClient`]: routes each operation to the provider that serves it
//!
//! Persistence is behind the traits in [`store`]; the SQLite implementation
//! lives in the storage crate.

pub mod batch;
pub mod client;
pub mod freshness;
pub mod inflight;
pub mod memo;
pub mod service;
pub mod store;
pub mod symbols;


pub use batch::QuoteBatcher;
pub use client::MarketDataClient;
pub use freshness::{FreshnessCache, FreshnessPolicy};
pub use inflight::{KeyedGuard, KeyedLocks};
pub use memo::Memoizer;
pub use service::{MarketDataService, MarketDataServiceTrait, MarketDataStores, NewsPage};
pub use store::{CurrentRecordStore, NewsStore, PriceBarStore};
pub use symbols::{normalize_query, normalize_symbol, normalize_symbols, popular_symbols, PopularSymbol};
