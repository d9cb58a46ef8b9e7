//! SQLite storage implementation for Marketfeed.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the store traits defined in `marketfeed-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - The market data cache repository
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//!
//! ```text
//!      core (cache policy)
//!              │
//!              ▼
//!   storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod market_data;
pub mod schema;
mod utils;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use market_data::MarketCacheRepository;

// Re-export from marketfeed-core for convenience
pub use marketfeed_core::errors::{DatabaseError, Error, Result};
