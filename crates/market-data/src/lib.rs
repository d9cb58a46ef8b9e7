//! Marketfeed Market Data Crate
//!
//! This crate talks to upstream financial-data providers under strict
//! per-provider request-rate ceilings.
//!
//! # Overview
//!
//! The market data crate provides:
//! - Canonical, provider-agnostic records (quotes, daily bars, fundamentals, news)
//! - A sliding-window rate limiter, one window per provider
//! - A retrying transport with exponential backoff on transient failures
//! - Provider adapters: Financial Modeling Prep and Finnhub
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  Caller (core)   |
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | Provider adapter |  (FMP, Finnhub: URL shape, auth, field mapping)
//! +------------------+
//!          |  FetchRequest
//!          v
//! +------------------+
//! | RetryingTransport|  (timeout, backoff on timeout / reset / 429)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |   RateLimiter    |  (sliding window per provider)
//! +------------------+
//!          |
//!          v
//!       network
//! ```
//!
//! Caching is deliberately absent here; the freshness and memo layers live
//! in `marketfeed-core`.

pub mod errors;
pub mod models;
pub mod provider;
pub mod transport;

// Re-export all public types from models
pub use models::{
    CanonicalRecord, CompanyMetrics, CompanyProfile, FetchRequest, Fundamentals, NewsItem,
    PriceBar, ProviderId, Quote, RecordKind, SymbolMatch,
};

pub use errors::{FetchError, RetryClass};

// Re-export provider types
pub use provider::finnhub::FinnhubProvider;
pub use provider::fmp::FmpProvider;
pub use provider::{MarketDataProvider, ProviderCapabilities, ProviderConfig};

// Re-export transport types
pub use transport::{
    HttpSend, RateLimitConfig, RateLimiter, RawResponse, ReqwestSender, RetryPolicy,
    RetryingTransport, SendError,
};
