//! SQLite storage implementation for the market data cache.

mod model;
mod repository;

#[cfg(test)]
mod repository_tests;

pub use model::{CachedRecordDB, NewsItemDB, PriceBarDB};
pub use repository::MarketCacheRepository;
