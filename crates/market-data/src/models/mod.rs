//! Market data models
//!
//! This module contains the canonical, provider-agnostic records and the
//! request type adapters hand to the transport:
//! - `types` - Type aliases for common identifiers (ProviderId)
//! - `kind` - Record / operation family (RecordKind)
//! - `request` - Immutable outbound call description (FetchRequest)
//! - `quote`, `bar`, `fundamentals`, `news`, `search`, `profile` - canonical records
//! - `record` - Trait shared by records that carry a `fetched_at`

mod bar;
mod fundamentals;
mod kind;
mod news;
mod profile;
mod quote;
mod record;
mod request;
mod search;
mod types;

pub use bar::PriceBar;
pub use fundamentals::{CompanyMetrics, Fundamentals};
pub use kind::RecordKind;
pub use news::NewsItem;
pub use profile::CompanyProfile;
pub use quote::Quote;
pub use record::CanonicalRecord;
pub use request::FetchRequest;
pub use search::SymbolMatch;
pub use types::ProviderId;
