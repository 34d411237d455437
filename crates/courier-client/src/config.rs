use std::str::FromStr;
use std::time::Duration;

use courier_queue::DEFAULT_LANE_DELAY;

use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_RETRIES};

/// Default per-attempt HTTP timeout.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Error raised when an environment variable holds an unusable value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Orchestrator configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourierConfig {
    /// Timeout applied by the default transport to each attempt.
    pub http_timeout: Duration,
    /// Delay for lanes created without an explicit one.
    pub lane_delay: Duration,
    /// Policy for calls that request retry without naming one.
    pub retry: RetryPolicy,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            lane_delay: DEFAULT_LANE_DELAY,
            retry: RetryPolicy::default(),
        }
    }
}

impl CourierConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `COURIER_HTTP_TIMEOUT_SECS`   | `30`    |
    /// | `COURIER_LANE_DELAY_MS`       | `100`   |
    /// | `COURIER_RETRY_ATTEMPTS`      | `3`     |
    /// | `COURIER_RETRY_BASE_DELAY_MS` | `100`   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let http_timeout_secs: u64 = parse_var(
            &lookup,
            "COURIER_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
            "number of seconds",
        )?;
        let lane_delay_ms: u64 = parse_var(
            &lookup,
            "COURIER_LANE_DELAY_MS",
            DEFAULT_LANE_DELAY.as_millis() as u64,
            "number of milliseconds",
        )?;
        let retries: u32 = parse_var(
            &lookup,
            "COURIER_RETRY_ATTEMPTS",
            DEFAULT_RETRIES,
            "retry count",
        )?;
        let retry_base_ms: u64 = parse_var(
            &lookup,
            "COURIER_RETRY_BASE_DELAY_MS",
            DEFAULT_BASE_DELAY.as_millis() as u64,
            "number of milliseconds",
        )?;

        Ok(Self {
            http_timeout: Duration::from_secs(http_timeout_secs),
            lane_delay: Duration::from_millis(lane_delay_ms),
            retry: RetryPolicy {
                retries,
                base_delay: Duration::from_millis(retry_base_ms),
            },
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value: raw,
            expected,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
