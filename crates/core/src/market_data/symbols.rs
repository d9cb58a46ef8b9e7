//! Symbol and query normalization.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_SYMBOL_LEN, POPULAR_SYMBOLS};
use crate::errors::{Result, ValidationError};

/// Trim and upper-case a ticker, rejecting empty or oversized input.
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidSymbol(symbol.to_string(), "symbol is empty".to_string()).into());
    }
    if trimmed.chars().count() > MAX_SYMBOL_LEN {
        return Err(ValidationError::InvalidSymbol(
            symbol.to_string(),
            format!("longer than {} characters", MAX_SYMBOL_LEN),
        )
        .into());
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidSymbol(
            symbol.to_string(),
            "contains whitespace".to_string(),
        )
        .into());
    }
    Ok(trimmed.to_uppercase())
}

/// Normalize every symbol and drop duplicates, keeping first-seen order.
pub fn normalize_symbols(symbols: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::with_capacity(symbols.len());
    let mut out = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let symbol = normalize_symbol(symbol)?;
        if seen.insert(symbol.clone()) {
            out.push(symbol);
        }
    }
    Ok(out)
}

/// Memo key for a search query: trimmed and lower-cased. `None` for blank input.
pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// A ticker with its display name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularSymbol {
    pub symbol: String,
    pub company_name: String,
}

/// The fixed list of widely followed tickers.
pub fn popular_symbols() -> Vec<PopularSymbol> {
    POPULAR_SYMBOLS
        .iter()
        .map(|(symbol, name)| PopularSymbol {
            symbol: symbol.to_string(),
            company_name: name.to_string(),
        })
        .collect()
}
