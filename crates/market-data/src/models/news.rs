use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Company news headline. Persisted unique on `(symbol, url)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub symbol: String,
    pub published_at: DateTime<Utc>,
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    /// Publisher name as reported by the provider
    #[serde(default)]
    pub source: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub fetched_at: DateTime<Utc>,
}
