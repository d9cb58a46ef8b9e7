//! Provider capabilities.
//!
//! Describes which logical operations an adapter implements.

/// Describes the capabilities of a market data provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Latest quote for one symbol.
    pub supports_quotes: bool,

    /// Native multi-symbol quote endpoint. Zero when quotes are fetched
    /// one symbol per call.
    pub batch_size: usize,

    /// Daily bars over a date range.
    pub supports_historical: bool,

    /// Company name / sector / industry.
    pub supports_profile: bool,

    /// Symbol search.
    pub supports_search: bool,

    /// Key ratios (P/E, EPS, beta, ...).
    pub supports_metrics: bool,

    /// Company news headlines.
    pub supports_news: bool,
}

impl ProviderCapabilities {
    pub fn supports_batch_quotes(&self) -> bool {
        self.batch_size > 1
    }
}
