//! Outbound call plumbing shared by every provider adapter.
//!
//! - `rate_limiter` - per-provider sliding-window admission (RateLimiter)
//! - `http` - the network seam (HttpSend, ReqwestSender, RawResponse)
//! - `retrying` - admission + timeout + backoff around one request (RetryingTransport)

mod http;
mod rate_limiter;
mod retrying;

pub use http::{HttpSend, RawResponse, ReqwestSender, SendError};
pub use rate_limiter::{RateLimitConfig, RateLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
pub use retrying::{RetryPolicy, RetryingTransport};
