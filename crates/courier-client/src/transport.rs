//! HTTP transport seam.
//!
//! The orchestrator talks to the network only through [`Transport`].
//! [`ReqwestTransport`] is the default implementation; tests and callers
//! with special needs can supply their own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;

pub use reqwest::Method;

/// How the response body is decoded before it reaches the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// Parse as JSON. An empty body becomes `null`; a body that is not
    /// valid JSON is passed on as a JSON string.
    #[default]
    Json,
    /// Pass the body on as a JSON string, unparsed.
    Text,
}

/// A fully resolved outbound request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub base_url: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub params: Option<Value>,
    pub response_type: ResponseType,
}

impl TransportRequest {
    /// The target URL: `url` when it is absolute, otherwise `url` joined
    /// onto `base_url` with exactly one `/` between them.
    pub fn resolved_url(&self) -> String {
        match &self.base_url {
            Some(base) if !is_absolute_url(&self.url) => join_url(base, &self.url),
            _ => self.url.clone(),
        }
    }

    /// Encode `params` as query pairs.
    ///
    /// - `null` values are skipped.
    /// - Arrays repeat the key as `key[]`.
    /// - Nested objects are JSON-encoded.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>, TransportError> {
        let mut pairs = Vec::new();
        match &self.params {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                for (key, value) in map {
                    match value {
                        Value::Array(items) => {
                            let array_key = format!("{key}[]");
                            for item in items {
                                push_pair(&mut pairs, &array_key, item);
                            }
                        }
                        _ => push_pair(&mut pairs, key, value),
                    }
                }
            }
            Some(other) => {
                return Err(TransportError::InvalidParams(format!(
                    "expected an object, got {}",
                    json_kind(other)
                )));
            }
        }
        Ok(pairs)
    }
}

/// `Accept` and `Content-Type` set to `application/json`, used when a
/// request declares no headers of its own.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Errors from the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream returned a non-2xx status code.
    #[error("Upstream returned HTTP {status}")]
    Status {
        status: u16,
        /// Decoded response body, for error handlers and debugging.
        body: Value,
    },

    /// The request params could not be encoded as a query string.
    #[error("Invalid request params: {0}")]
    InvalidParams(String),

    /// Failure reported by a custom [`Transport`].
    #[error("Transport failed: {0}")]
    Other(String),
}

impl TransportError {
    /// HTTP status of the failed response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Executes a [`TransportRequest`] and returns the decoded response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &TransportRequest) -> Result<Value, TransportError>;
}

// ---------------------------------------------------------------------------
// ReqwestTransport
// ---------------------------------------------------------------------------

/// [`Transport`] backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a client that gives up on any single attempt after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Reuse an existing [`reqwest::Client`] (and its connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> Result<Value, TransportError> {
        let query = request.query_pairs()?;

        let mut builder = self
            .client
            .request(request.method.clone(), request.resolved_url())
            .headers(request.headers.clone());

        if !query.is_empty() {
            builder = builder.query(&query);
        }

        builder = match &request.body {
            None => builder,
            Some(Value::String(raw)) => builder.body(raw.clone()),
            Some(body) => builder.json(body),
        };

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = decode_body(text, request.response_type);

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

// ---- private helpers ----

fn decode_body(text: String, response_type: ResponseType) -> Value {
    match response_type {
        ResponseType::Text => Value::String(text),
        ResponseType::Json if text.trim().is_empty() => Value::Null,
        ResponseType::Json => serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text)),
    }
}

/// `scheme://…` or protocol-relative `//…`.
fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    let Some((scheme, rest)) = url.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid_scheme && rest.starts_with("//")
}

fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn push_pair(pairs: &mut Vec<(String, String)>, key: &str, value: &Value) {
    let encoded = match value {
        Value::Null => return,
        Value::String(s) => s.clone(),
        _ => value.to_string(),
    };
    pairs.push((key.to_string(), encoded));
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
