//! Manual smoke tool: issue one orchestrated request described by
//! environment variables and log the outcome.
//!
//! | Env Var           | Default | Meaning                                |
//! |-------------------|---------|----------------------------------------|
//! | `PROBE_URL`       | —       | Target URL (required)                  |
//! | `PROBE_METHOD`    | `GET`   | HTTP method                            |
//! | `PROBE_BASE_URL`  | —       | Base URL for a relative `PROBE_URL`    |
//! | `PROBE_BODY`      | —       | JSON request body                      |
//! | `PROBE_QUEUE_KEY` | —       | Route the request through this lane    |
//! | `PROBE_RETRY`     | `false` | Retry transient failures               |
//!
//! Orchestrator defaults come from [`CourierConfig::from_env`].

use std::process::ExitCode;

use courier_client::{CourierConfig, Method, Orchestrator, RequestSpec};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "courier_probe=debug,courier_client=debug,courier_queue=debug";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match CourierConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        http_timeout_secs = config.http_timeout.as_secs(),
        lane_delay_ms = config.lane_delay.as_millis() as u64,
        retries = config.retry.retries,
        "Loaded courier configuration",
    );

    let spec = match spec_from_env() {
        Ok(spec) => spec,
        Err(message) => {
            tracing::error!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let orchestrator = match Orchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP transport");
            return ExitCode::FAILURE;
        }
    };

    match orchestrator.execute(&spec).await {
        Ok(body) => {
            tracing::info!(method = %spec.method(), url = spec.url(), "Request succeeded");
            println!("{body:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(method = %spec.method(), url = spec.url(), error = %e, "Request failed");
            ExitCode::FAILURE
        }
    }
}

/// Build the request from `PROBE_*` variables.
fn spec_from_env() -> Result<RequestSpec, String> {
    let url = std::env::var("PROBE_URL").map_err(|_| "PROBE_URL must be set".to_string())?;

    let method = match std::env::var("PROBE_METHOD") {
        Ok(raw) => Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| format!("PROBE_METHOD is not a valid HTTP method: {raw:?}"))?,
        Err(_) => Method::GET,
    };

    let mut spec = RequestSpec::new(method, url);

    if let Ok(base_url) = std::env::var("PROBE_BASE_URL") {
        spec = spec.base_url(base_url);
    }

    if let Ok(raw) = std::env::var("PROBE_BODY") {
        let body: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| format!("PROBE_BODY must be valid JSON: {e}"))?;
        spec = spec.data(body);
    }

    if let Ok(key) = std::env::var("PROBE_QUEUE_KEY") {
        spec = spec.queue(key, None);
    }

    let retry = std::env::var("PROBE_RETRY")
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);

    Ok(spec.retry(retry))
}
