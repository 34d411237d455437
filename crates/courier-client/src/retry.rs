//! Per-call retry with exponential backoff.
//!
//! [`send_with_retry`] wraps a single [`Transport::send`] call. It never
//! touches the transport's own configuration, so concurrent calls sharing
//! a transport can use different policies.
//!
//! Retried failures:
//! - connection failures, for any method;
//! - timeouts, and HTTP 5xx or 429 responses, for idempotent methods
//!   only (GET, HEAD, OPTIONS, PUT, DELETE).

use std::time::Duration;

use serde_json::Value;

use crate::transport::{Method, Transport, TransportError, TransportRequest};

/// Retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 3;

/// Base unit of the exponential backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Maximum random extra delay, as a fraction of the computed backoff.
const JITTER_FRACTION: f64 = 0.2;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (so `retries + 1` attempts total).
    pub retries: u32,
    /// The n-th retry waits `base_delay * 2^n`, plus up to 20% jitter.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the `retry`-th retry (1-based), without jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(retry))
    }

    fn jittered_backoff(&self, retry: u32) -> Duration {
        let backoff = self.backoff(retry);
        backoff.saturating_add(backoff.mul_f64(rand::random::<f64>() * JITTER_FRACTION))
    }
}

/// Whether `error` from a `method` request is worth another attempt.
pub fn is_retryable(method: &Method, error: &TransportError) -> bool {
    let idempotent = matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
    );

    match error {
        TransportError::Request(e) if e.is_connect() => true,
        TransportError::Request(e) if e.is_timeout() => idempotent,
        TransportError::Status { status, .. } => {
            idempotent && (*status >= 500 || *status == 429)
        }
        _ => false,
    }
}

/// Send `request`, retrying retryable failures according to `policy`.
///
/// Returns the first success, or the error of the last attempt.
pub async fn send_with_retry(
    transport: &dyn Transport,
    request: &TransportRequest,
    policy: &RetryPolicy,
) -> Result<Value, TransportError> {
    let mut retry = 0;

    loop {
        match transport.send(request).await {
            Ok(body) => return Ok(body),
            Err(e) if retry < policy.retries && is_retryable(&request.method, &e) => {
                retry += 1;
                let delay = policy.jittered_backoff(retry);
                tracing::warn!(
                    attempt = retry,
                    method = %request.method,
                    url = %request.url,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Request attempt failed, retrying",
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if retry > 0 {
                    tracing::error!(
                        attempts = retry + 1,
                        method = %request.method,
                        url = %request.url,
                        error = %e,
                        "Request failed after all retries",
                    );
                }
                return Err(e);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
