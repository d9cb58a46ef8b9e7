//! Process configuration from the environment.

use std::time::Duration;

use anyhow::{anyhow, Context};
use marketfeed_core::constants::POPULAR_SYMBOLS;
use marketfeed_core::market_data::FreshnessPolicy;
use marketfeed_market_data::{RateLimitConfig, RetryPolicy};

const DEFAULT_DB_PATH: &str = "./db/marketfeed.db";
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

#[derive(Clone, Debug)]
pub struct Config {
    pub fmp_api_key: String,
    pub finnhub_api_key: String,
    pub db_path: String,
    pub watchlist: Vec<String>,
    pub refresh_interval: Duration,
    /// Applied to every provider when set; otherwise each uses its own default.
    pub rate_limit: Option<RateLimitConfig>,
    pub retry: RetryPolicy,
    pub freshness: FreshnessPolicy,
}

impl Config {
    /// Load `.env` (if present) and read `MARKETFEED_*` variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{} must be set", key));
        let number = |key: &str, default: u64| -> anyhow::Result<u64> {
            match get(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .with_context(|| format!("{} must be a whole number, got '{}'", key, raw)),
                None => Ok(default),
            }
        };

        let watchlist = match get("MARKETFEED_WATCHLIST") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => POPULAR_SYMBOLS.iter().map(|(s, _)| s.to_string()).collect(),
        };

        let rate_limit = match get("MARKETFEED_RATE_LIMIT_PER_MINUTE") {
            Some(_) => {
                let per_minute = u32::try_from(number("MARKETFEED_RATE_LIMIT_PER_MINUTE", 0)?)
                    .context("MARKETFEED_RATE_LIMIT_PER_MINUTE is too large")?;
                Some(RateLimitConfig::per_minute(per_minute))
            }
            None => None,
        };

        let defaults = FreshnessPolicy::default();
        let retry_defaults = RetryPolicy::default();

        Ok(Self {
            fmp_api_key: required("MARKETFEED_FMP_API_KEY")?,
            finnhub_api_key: required("MARKETFEED_FINNHUB_API_KEY")?,
            db_path: get("MARKETFEED_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            watchlist,
            refresh_interval: Duration::from_secs(
                number("MARKETFEED_REFRESH_INTERVAL_SECS", DEFAULT_REFRESH_INTERVAL_SECS)?.max(1),
            ),
            rate_limit,
            retry: RetryPolicy {
                max_retries: u32::try_from(number(
                    "MARKETFEED_MAX_RETRIES",
                    u64::from(retry_defaults.max_retries),
                )?)
                .context("MARKETFEED_MAX_RETRIES is too large")?,
                initial_backoff: Duration::from_millis(number(
                    "MARKETFEED_INITIAL_BACKOFF_MS",
                    retry_defaults.initial_backoff.as_millis() as u64,
                )?),
                request_timeout: Duration::from_secs(number(
                    "MARKETFEED_REQUEST_TIMEOUT_SECS",
                    retry_defaults.request_timeout.as_secs(),
                )?),
            },
            freshness: FreshnessPolicy {
                quote: Duration::from_secs(number("MARKETFEED_QUOTE_TTL_SECS", defaults.quote.as_secs())?),
                fundamentals: Duration::from_secs(number(
                    "MARKETFEED_FUNDAMENTALS_TTL_SECS",
                    defaults.fundamentals.as_secs(),
                )?),
                search: Duration::from_secs(number("MARKETFEED_SEARCH_TTL_SECS", defaults.search.as_secs())?),
            },
        })
    }
}
