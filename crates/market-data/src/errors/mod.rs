//! Error types and retry classification for the fetch layer.
//!
//! This module provides:
//! - [`FetchError`]: every way a call to an upstream provider can fail
//! - [`RetryClass`]: classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while fetching data from a provider.
///
/// Only [`TransientNetwork`](Self::TransientNetwork) and
/// [`RateLimited`](Self::RateLimited) are retried by the transport; everything
/// else reaches the adapter on the first occurrence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Timeout, connection reset or any other failure below HTTP.
    #[error("Transient network failure: {provider} - {message}")]
    TransientNetwork {
        /// The provider being called
        provider: String,
        /// Description of the underlying failure
        message: String,
    },

    /// The provider answered HTTP 429.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The provider answered with a non-2xx status other than 429.
    #[error("Provider rejected request: {provider} - HTTP {status}")]
    Rejected {
        /// The provider that rejected the request
        provider: String,
        /// HTTP status code
        status: u16,
    },

    /// The provider answered successfully but had nothing for the request
    /// (unknown symbol, empty range). A normal outcome, not a fault.
    #[error("No data: {provider} - {message}")]
    NoData {
        /// The provider that returned the empty payload
        provider: String,
        /// What was missing
        message: String,
    },

    /// The payload could not be decoded into the expected shape.
    #[error("Malformed response: {provider} - {message}")]
    Malformed {
        /// The provider that returned the payload
        provider: String,
        /// Decoder message
        message: String,
    },

    /// Every attempt failed with a retryable error.
    #[error("Retries exhausted: {provider} after {attempts} attempts")]
    RetriesExhausted {
        /// The provider being called
        provider: String,
        /// Total attempts performed, including the first one
        attempts: u32,
    },

    /// The request could not be built (bad URL, invalid header).
    #[error("Invalid request: {provider} - {message}")]
    InvalidRequest {
        /// The provider being called
        provider: String,
        /// Builder message
        message: String,
    },

    /// The adapter does not implement this operation.
    #[error("Operation not supported: {operation} by {provider}")]
    NotSupported {
        /// The operation that was requested
        operation: String,
        /// The provider that lacks it
        provider: String,
    },
}

impl FetchError {
    /// Shorthand for [`FetchError::NoData`].
    pub fn no_data(provider: &str, message: impl Into<String>) -> Self {
        Self::NoData {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for [`FetchError::Malformed`].
    pub fn malformed(provider: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use marketfeed_market_data::errors::{FetchError, RetryClass};
    ///
    /// let error = FetchError::RateLimited { provider: "FMP".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = FetchError::Rejected { provider: "FMP".to_string(), status: 403 };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::TransientNetwork { .. } | Self::RateLimited { .. } => RetryClass::WithBackoff,

            Self::Rejected { .. }
            | Self::NoData { .. }
            | Self::Malformed { .. }
            | Self::RetriesExhausted { .. }
            | Self::InvalidRequest { .. }
            | Self::NotSupported { .. } => RetryClass::Never,
        }
    }

    /// True when the provider simply had nothing to return.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }

    /// The provider this error originated from.
    pub fn provider(&self) -> &str {
        match self {
            Self::TransientNetwork { provider, .. }
            | Self::RateLimited { provider }
            | Self::Rejected { provider, .. }
            | Self::NoData { provider, .. }
            | Self::Malformed { provider, .. }
            | Self::RetriesExhausted { provider, .. }
            | Self::InvalidRequest { provider, .. }
            | Self::NotSupported { provider, .. } => provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_failures_retry_with_backoff() {
        let timeout = FetchError::TransientNetwork {
            provider: "FMP".to_string(),
            message: "timed out".to_string(),
        };
        let throttled = FetchError::RateLimited {
            provider: "FINNHUB".to_string(),
        };
        assert_eq!(timeout.retry_class(), RetryClass::WithBackoff);
        assert_eq!(throttled.retry_class(), RetryClass::WithBackoff);
    }

    #[test]
    fn test_terminal_failures_never_retry() {
        let errors = [
            FetchError::Rejected {
                provider: "FMP".to_string(),
                status: 403,
            },
            FetchError::no_data("FMP", "empty array"),
            FetchError::malformed("FMP", "expected array"),
            FetchError::RetriesExhausted {
                provider: "FMP".to_string(),
                attempts: 4,
            },
        ];
        for error in errors {
            assert_eq!(error.retry_class(), RetryClass::Never, "{error}");
        }
    }

    #[test]
    fn test_is_no_data() {
        assert!(FetchError::no_data("FMP", "nothing").is_no_data());
        assert!(!FetchError::malformed("FMP", "bad json").is_no_data());
    }

    #[test]
    fn test_error_display() {
        let error = FetchError::Rejected {
            provider: "FINNHUB".to_string(),
            status: 401,
        };
        assert_eq!(
            error.to_string(),
            "Provider rejected request: FINNHUB - HTTP 401"
        );
        assert_eq!(error.provider(), "FINNHUB");

        let error = FetchError::RetriesExhausted {
            provider: "FMP".to_string(),
            attempts: 4,
        };
        assert_eq!(error.to_string(), "Retries exhausted: FMP after 4 attempts");
    }
}
