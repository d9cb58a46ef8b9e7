//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all adapters implement
//! - Provider capabilities and connection configuration
//! - Concrete adapters: FMP (quotes, history, profile, search) and
//!   Finnhub (metrics, news)
//!
//! Adapters build a [`FetchRequest`](crate::models::FetchRequest), hand it to
//! the shared [`RetryingTransport`](crate::transport::RetryingTransport) and
//! map the JSON payload into canonical records. Empty payloads surface as
//! [`FetchError::NoData`](crate::errors::FetchError::NoData).

mod capabilities;
mod config;
mod traits;

pub mod finnhub;
pub mod fmp;

// Re-exports
pub use capabilities::ProviderCapabilities;
pub use config::ProviderConfig;
pub use traits::MarketDataProvider;
