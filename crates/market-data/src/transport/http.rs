//! The single network seam of the crate.
//!
//! [`HttpSend`] performs exactly one GET for a [`FetchRequest`]; everything
//! above it (admission, retry, decoding) is network-free and testable with a
//! scripted sender.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::errors::FetchError;
use crate::models::FetchRequest;

/// Status and body of a completed HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body, mapping parse failures to [`FetchError::Malformed`].
    pub fn json<T: DeserializeOwned>(&self, provider: &str) -> Result<T, FetchError> {
        serde_json::from_str(&self.body)
            .map_err(|e| FetchError::malformed(provider, format!("Failed to parse response: {}", e)))
    }
}

/// Failure below the HTTP layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendError {
    /// No response within the request timeout.
    Timeout,
    /// Connect/reset/body-read failure.
    Connection(String),
    /// The request could not be built; retrying will not help.
    Invalid(String),
}

#[async_trait]
pub trait HttpSend: Send + Sync {
    async fn send(&self, request: &FetchRequest, timeout: Duration) -> Result<RawResponse, SendError>;
}

/// [`HttpSend`] backed by a shared `reqwest` client.
pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(concat!("marketfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpSend for ReqwestSender {
    async fn send(&self, request: &FetchRequest, timeout: Duration) -> Result<RawResponse, SendError> {
        let response = self
            .client
            .get(request.url())
            .query(&request.query_pairs())
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(RawResponse { status, body })
    }
}

// The URL carries the API key, so it is stripped before the message is kept.
fn classify(error: reqwest::Error) -> SendError {
    if error.is_timeout() {
        SendError::Timeout
    } else if error.is_builder() {
        SendError::Invalid(error.without_url().to_string())
    } else {
        SendError::Connection(error.without_url().to_string())
    }
}
