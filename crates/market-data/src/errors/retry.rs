/// Classification for retry policy.
///
/// Used by the [`RetryingTransport`](crate::transport::RetryingTransport) to decide
/// whether a failed attempt is worth repeating.
///
/// # Behavior Summary
///
/// | Class | Retried? | Typical causes |
/// |-------|----------|----------------|
/// | `WithBackoff` | Yes, after an exponential delay | timeout, connection reset, HTTP 429 |
/// | `Never` | No | other non-2xx status, empty payload, bad request |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Transient failure. Sleep `initial_backoff * 2^retry` and try again
    /// until the retry budget is spent.
    WithBackoff,

    /// Terminal failure. Retrying the identical request cannot succeed.
    Never,
}
