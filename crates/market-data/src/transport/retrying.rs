//! Call-with-resilience: rate admission, fixed timeout and exponential
//! backoff around a single provider request. Nothing here caches.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::http::{HttpSend, RawResponse, ReqwestSender, SendError};
use super::rate_limiter::RateLimiter;
use crate::errors::{FetchError, RetryClass};
use crate::models::FetchRequest;

const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Retry budget and timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Base delay; the n-th retry sleeps `initial_backoff * 2^n`.
    pub initial_backoff: Duration,
    /// Per-attempt timeout.
    pub request_timeout: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Executes provider requests through the shared [`RateLimiter`].
///
/// One instance is shared by every adapter so that all traffic to a
/// provider, whatever the operation, counts against the same window.
pub struct RetryingTransport {
    sender: Arc<dyn HttpSend>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    /// Transport over a real HTTP client.
    pub fn new(limiter: Arc<RateLimiter>, policy: RetryPolicy) -> Self {
        Self::with_sender(Arc::new(ReqwestSender::new()), limiter, policy)
    }

    pub fn with_sender(sender: Arc<dyn HttpSend>, limiter: Arc<RateLimiter>, policy: RetryPolicy) -> Self {
        Self {
            sender,
            limiter,
            policy,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run `request` to a 2xx response or a terminal failure.
    ///
    /// Timeouts, connection errors and HTTP 429 are retried with backoff.
    /// Any other non-2xx status returns [`FetchError::Rejected`] after one
    /// attempt. Running out of attempts returns
    /// [`FetchError::RetriesExhausted`].
    pub async fn execute(&self, request: &FetchRequest) -> Result<RawResponse, FetchError> {
        let provider = request.provider();
        let max_attempts = self.policy.max_attempts();

        for attempt in 1..=max_attempts {
            self.limiter.admit(provider).await;

            debug!(
                provider,
                operation = %request.operation(),
                attempt,
                "Sending provider request"
            );

            let error = match self.sender.send(request, self.policy.request_timeout).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if response.status == STATUS_TOO_MANY_REQUESTS => {
                    FetchError::RateLimited {
                        provider: provider.to_string(),
                    }
                }
                Ok(response) => {
                    warn!(
                        provider,
                        operation = %request.operation(),
                        status = response.status,
                        "Provider rejected request"
                    );
                    return Err(FetchError::Rejected {
                        provider: provider.to_string(),
                        status: response.status,
                    });
                }
                Err(SendError::Invalid(message)) => {
                    return Err(FetchError::InvalidRequest {
                        provider: provider.to_string(),
                        message,
                    });
                }
                Err(SendError::Timeout) => FetchError::TransientNetwork {
                    provider: provider.to_string(),
                    message: format!("no response within {:?}", self.policy.request_timeout),
                },
                Err(SendError::Connection(message)) => FetchError::TransientNetwork {
                    provider: provider.to_string(),
                    message,
                },
            };

            if error.retry_class() == RetryClass::Never {
                return Err(error);
            }

            if attempt < max_attempts {
                let delay = self.policy.backoff_delay(attempt);
                warn!(
                    provider,
                    attempt,
                    max_attempts,
                    ?delay,
                    error = %error,
                    "Retrying provider request"
                );
                tokio::time::sleep(delay).await;
            } else {
                warn!(provider, attempts = max_attempts, error = %error, "Giving up on provider request");
            }
        }

        Err(FetchError::RetriesExhausted {
            provider: provider.to_string(),
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordKind;
    use crate::transport::RateLimitConfig;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays a fixed script of outcomes and records when each send happened.
    struct ScriptedSender {
        script: Mutex<VecDeque<Result<RawResponse, SendError>>>,
        fallback: Result<RawResponse, SendError>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedSender {
        fn new(script: Vec<Result<RawResponse, SendError>>, fallback: Result<RawResponse, SendError>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpSend for ScriptedSender {
        async fn send(&self, _request: &FetchRequest, _timeout: Duration) -> Result<RawResponse, SendError> {
            self.calls.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    fn transport(sender: Arc<ScriptedSender>) -> RetryingTransport {
        let limiter = Arc::new(RateLimiter::with_default(RateLimitConfig::per_minute(1_000)));
        RetryingTransport::with_sender(sender, limiter, RetryPolicy::default())
    }

    fn request() -> FetchRequest {
        FetchRequest::new("FMP", RecordKind::Quote, "http://localhost/quote/AAPL")
    }

    fn gaps(times: &[Instant]) -> Vec<Duration> {
        times.windows(2).map(|w| w[1].duration_since(w[0])).collect()
    }

    #[test]
    fn test_backoff_doubles_from_first_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() {
        let sender = ScriptedSender::new(
            vec![
                Err(SendError::Timeout),
                Err(SendError::Connection("connection reset".to_string())),
            ],
            Ok(RawResponse::new(200, "[]")),
        );
        let transport = transport(Arc::clone(&sender));

        let response = transport.execute(&request()).await.unwrap();

        assert_eq!(response.body, "[]");
        let calls = sender.call_times();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            gaps(&calls),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_429_is_retried() {
        let sender = ScriptedSender::new(
            vec![Ok(RawResponse::new(429, ""))],
            Ok(RawResponse::new(200, "{}")),
        );
        let transport = transport(Arc::clone(&sender));

        assert!(transport.execute(&request()).await.is_ok());
        assert_eq!(sender.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_is_not_retried() {
        let sender = ScriptedSender::new(vec![], Ok(RawResponse::new(403, "forbidden")));
        let transport = transport(Arc::clone(&sender));

        let err = transport.execute(&request()).await.unwrap_err();

        assert_eq!(
            err,
            FetchError::Rejected {
                provider: "FMP".to_string(),
                status: 403
            }
        );
        assert_eq!(sender.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_after_max_attempts() {
        let sender = ScriptedSender::new(vec![], Err(SendError::Timeout));
        let transport = transport(Arc::clone(&sender));

        let err = transport.execute(&request()).await.unwrap_err();

        assert_eq!(
            err,
            FetchError::RetriesExhausted {
                provider: "FMP".to_string(),
                attempts: 4
            }
        );
        let calls = sender.call_times();
        assert_eq!(
            gaps(&calls),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_request_fails_fast() {
        let sender = ScriptedSender::new(vec![], Err(SendError::Invalid("bad url".to_string())));
        let transport = transport(Arc::clone(&sender));

        let err = transport.execute(&request()).await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidRequest { .. }));
        assert_eq!(sender.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_passes_through_limiter() {
        let sender = ScriptedSender::new(vec![Err(SendError::Timeout)], Ok(RawResponse::new(200, "")));
        let limiter = Arc::new(RateLimiter::with_default(RateLimitConfig::per_minute(1_000)));
        let transport = RetryingTransport::with_sender(sender, Arc::clone(&limiter), RetryPolicy::default());

        transport.execute(&request()).await.unwrap();

        assert_eq!(limiter.recent_requests("FMP").await, 2);
    }
}
