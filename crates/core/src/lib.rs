//! Marketfeed Core - caching and orchestration over market data providers.
//!
//! This crate decides when to call a provider and when to answer from
//! storage. It is database-agnostic and defines store traits that are
//! implemented by the `storage-sqlite` crate.

pub mod constants;
pub mod errors;
pub mod market_data;

pub use market_data::{MarketDataService, MarketDataServiceTrait, MarketDataStores};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
