use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::CompanyProfile;

/// Key ratios as reported by the metrics provider, before the company
/// profile is merged in.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMetrics {
    pub symbol: String,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub revenue_per_share: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub profit_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub price_to_book: Option<f64>,
    pub rsi: Option<f64>,
    pub beta: Option<f64>,
    pub fifty_day_ma: Option<f64>,
    pub two_hundred_day_ma: Option<f64>,
}

/// Fundamentals snapshot: metrics plus descriptive profile fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fundamentals {
    pub symbol: String,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub revenue_per_share: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub profit_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub price_to_book: Option<f64>,
    pub rsi: Option<f64>,
    pub beta: Option<f64>,
    pub fifty_day_ma: Option<f64>,
    pub two_hundred_day_ma: Option<f64>,
    /// Provider that supplied the metrics
    pub source: String,
    pub fetched_at: DateTime<Utc>,
}

impl Fundamentals {
    /// Merge metrics with an optional profile.
    ///
    /// Without a profile the company name falls back to the symbol and
    /// sector/industry stay empty.
    pub fn compose(
        metrics: CompanyMetrics,
        profile: Option<CompanyProfile>,
        source: impl Into<String>,
    ) -> Self {
        let profile = profile.unwrap_or_default();
        let company_name = profile
            .company_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| metrics.symbol.clone());

        Self {
            symbol: metrics.symbol,
            company_name,
            sector: profile.sector,
            industry: profile.industry,
            market_cap: metrics.market_cap,
            pe_ratio: metrics.pe_ratio,
            eps: metrics.eps,
            dividend_yield: metrics.dividend_yield,
            revenue_per_share: metrics.revenue_per_share,
            revenue_growth: metrics.revenue_growth,
            profit_margin: metrics.profit_margin,
            debt_to_equity: metrics.debt_to_equity,
            price_to_book: metrics.price_to_book,
            rsi: metrics.rsi,
            beta: metrics.beta,
            fifty_day_ma: metrics.fifty_day_ma,
            two_hundred_day_ma: metrics.two_hundred_day_ma,
            source: source.into(),
            fetched_at: Utc::now(),
        }
    }
}
