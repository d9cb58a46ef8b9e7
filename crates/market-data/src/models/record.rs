use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Fundamentals, NewsItem, PriceBar, Quote, RecordKind};

/// Common surface of every canonical record.
///
/// Lets the cache layer stay generic over "a thing keyed by symbol with a
/// fetch time" and lets storage persist any record as a JSON payload.
pub trait CanonicalRecord: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: RecordKind;

    fn symbol(&self) -> &str;

    fn fetched_at(&self) -> DateTime<Utc>;
}

impl CanonicalRecord for Quote {
    const KIND: RecordKind = RecordKind::Quote;

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

impl CanonicalRecord for Fundamentals {
    const KIND: RecordKind = RecordKind::Fundamentals;

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

impl CanonicalRecord for PriceBar {
    const KIND: RecordKind = RecordKind::Historical;

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

impl CanonicalRecord for NewsItem {
    const KIND: RecordKind = RecordKind::News;

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}
