use std::fmt;

use super::kind::RecordKind;
use super::types::ProviderId;

/// A single outbound provider call.
///
/// Built once per call by an adapter and never mutated afterwards; the
/// transport may send the same request several times when retrying. The
/// auth parameter is kept apart from the ordinary query so that `Debug`
/// output (and therefore logs) never contains an API key.
#[derive(Clone, PartialEq, Eq)]
pub struct FetchRequest {
    provider: ProviderId,
    operation: RecordKind,
    symbols: Vec<String>,
    url: String,
    query: Vec<(String, String)>,
    auth: Option<(String, String)>,
}

impl FetchRequest {
    pub fn new(provider: impl Into<ProviderId>, operation: RecordKind, url: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            operation,
            symbols: Vec::new(),
            url: url.into(),
            query: Vec::new(),
            auth: None,
        }
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach the API-key parameter (`apikey`, `token`, ...).
    pub fn with_auth(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.auth = Some((key.into(), secret.into()));
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn operation(&self) -> RecordKind {
        self.operation
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query parameters as sent on the wire, auth included last.
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        self.query
            .iter()
            .chain(self.auth.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("provider", &self.provider)
            .field("operation", &self.operation)
            .field("symbols", &self.symbols)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("auth", &self.auth.as_ref().map(|(k, _)| format!("{k}=<redacted>")))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FetchRequest {
        FetchRequest::new("FMP", RecordKind::Quote, "https://example.test/quote/AAPL")
            .with_symbols(["AAPL"])
            .with_query("limit", "10")
            .with_auth("apikey", "super-secret")
    }

    #[test]
    fn test_query_pairs_put_auth_last() {
        let req = request();
        assert_eq!(
            req.query_pairs(),
            vec![("limit", "10"), ("apikey", "super-secret")]
        );
        assert_eq!(req.provider(), "FMP");
        assert_eq!(req.symbols(), ["AAPL".to_string()]);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let rendered = format!("{:?}", request());
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("apikey=<redacted>"));
    }
}
