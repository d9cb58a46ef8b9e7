use serde::{Deserialize, Serialize};

/// One hit from a symbol search
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolMatch {
    pub symbol: String,
    pub company_name: String,
    /// Short exchange name (NASDAQ, NYSE, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
}

impl SymbolMatch {
    pub fn new(symbol: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            company_name: company_name.into(),
            exchange: None,
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }
}
