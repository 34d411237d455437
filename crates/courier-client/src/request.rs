//! Declarative description of one orchestrated call.
//!
//! A [`RequestSpec`] is assembled with builder methods and then handed to
//! [`Orchestrator::execute`](crate::Orchestrator::execute). It is not
//! modified by the call and can be reused.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use courier_client::{Method, RequestSpec};
//! use serde_json::json;
//!
//! let spec = RequestSpec::new(Method::POST, "/users")
//!     .base_url("https://api.example.com")
//!     .data(json!({"name": "x", "nickname": null}))
//!     .remove_nulls(true)
//!     .extra_body(json!({"source": "import"}))
//!     .queue("users-api", Some(Duration::from_millis(250)))
//!     .retry(true);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use courier_core::Schema;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::retry::RetryPolicy;
use crate::transport::{Method, ResponseType, Transport, TransportError};

/// Hook applied to the response before or after output validation.
pub type Processor = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Hook that turns a transport failure into a value, or re-raises it.
pub type ErrorHandler = Arc<dyn Fn(TransportError) -> Result<Value, TransportError> + Send + Sync>;

/// Lane routing for a call: requests with the same key run one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRoute {
    pub key: String,
    /// Delay after each task; only used when the lane is first created.
    pub delay: Option<Duration>,
}

/// Everything the orchestrator needs to perform one call.
#[derive(Clone)]
pub struct RequestSpec {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) base_url: Option<String>,
    pub(crate) headers: Option<HeaderMap>,
    pub(crate) response_type: ResponseType,

    pub(crate) data: Option<Value>,
    pub(crate) data_schema: Option<Arc<dyn Schema>>,
    pub(crate) params: Option<Value>,
    pub(crate) params_schema: Option<Arc<dyn Schema>>,
    pub(crate) remove_nulls: bool,
    pub(crate) extra_body: Option<Value>,
    pub(crate) extra_params: Option<Value>,

    pub(crate) retry: bool,
    pub(crate) retry_policy: Option<RetryPolicy>,
    pub(crate) queue: Option<QueueRoute>,
    pub(crate) transport: Option<Arc<dyn Transport>>,

    pub(crate) pre_processor: Option<Processor>,
    pub(crate) output_schema: Option<Arc<dyn Schema>>,
    pub(crate) post_processor: Option<Processor>,
    pub(crate) error_handler: Option<ErrorHandler>,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            base_url: None,
            headers: None,
            response_type: ResponseType::default(),
            data: None,
            data_schema: None,
            params: None,
            params_schema: None,
            remove_nulls: false,
            extra_body: None,
            extra_params: None,
            retry: false,
            retry_policy: None,
            queue: None,
            transport: None,
            pre_processor: None,
            output_schema: None,
            post_processor: None,
            error_handler: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Replace the request headers. Without any headers the call sends
    /// JSON `Accept` and `Content-Type`.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Add one header. The JSON defaults are not applied once any header
    /// has been set.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Request body.
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Schema the body must satisfy before anything is sent.
    pub fn data_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.data_schema = Some(Arc::new(schema));
        self
    }

    /// Query parameters.
    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn params_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.params_schema = Some(Arc::new(schema));
        self
    }

    /// Strip `null` fields from body and params before their schemas run.
    pub fn remove_nulls(mut self, remove_nulls: bool) -> Self {
        self.remove_nulls = remove_nulls;
        self
    }

    /// Fields merged onto the validated body, bypassing its schema.
    pub fn extra_body(mut self, extra: Value) -> Self {
        self.extra_body = Some(extra);
        self
    }

    /// Fields merged onto the validated params, bypassing their schema.
    pub fn extra_params(mut self, extra: Value) -> Self {
        self.extra_params = Some(extra);
        self
    }

    /// Retry transient failures with the orchestrator's default policy.
    pub fn retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    /// Retry transient failures with `policy` instead of the default.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = true;
        self.retry_policy = Some(policy);
        self
    }

    /// Route the call through the lane named `key`.
    pub fn queue(mut self, key: impl Into<String>, delay: Option<Duration>) -> Self {
        self.queue = Some(QueueRoute {
            key: key.into(),
            delay,
        });
        self
    }

    /// Use `transport` for this call instead of the orchestrator's.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn pre_processor<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.pre_processor = Some(Arc::new(hook));
        self
    }

    pub fn output_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.output_schema = Some(Arc::new(schema));
        self
    }

    pub fn post_processor<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.post_processor = Some(Arc::new(hook));
        self
    }

    /// Intercept transport failures: `Ok` replaces the response, `Err`
    /// re-raises.
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(TransportError) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn queue_route(&self) -> Option<&QueueRoute> {
        self.queue.as_ref()
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field(
                "header_names",
                &self.headers.as_ref().map(|h| h.keys().collect::<Vec<_>>()),
            )
            .field("response_type", &self.response_type)
            .field("data", &self.data)
            .field("has_data_schema", &self.data_schema.is_some())
            .field("params", &self.params)
            .field("has_params_schema", &self.params_schema.is_some())
            .field("remove_nulls", &self.remove_nulls)
            .field("extra_body", &self.extra_body)
            .field("extra_params", &self.extra_params)
            .field("retry", &self.retry)
            .field("retry_policy", &self.retry_policy)
            .field("queue", &self.queue)
            .field("has_output_schema", &self.output_schema.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use reqwest::header::AUTHORIZATION;
    use serde_json::json;

    use super::*;

    #[test]
    fn new_spec_has_no_optional_behaviour() {
        let spec = RequestSpec::new(Method::GET, "/ping");

        assert_eq!(spec.method(), &Method::GET);
        assert_eq!(spec.url(), "/ping");
        assert!(spec.headers.is_none());
        assert!(!spec.retry);
        assert!(spec.queue_route().is_none());
        assert_eq!(spec.response_type, ResponseType::Json);
    }

    #[test]
    fn single_header_starts_from_empty_map() {
        let spec = RequestSpec::new(Method::GET, "/ping")
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer t"));

        let headers = spec.headers.expect("headers should be set");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[AUTHORIZATION], "Bearer t");
    }

    #[test]
    fn retry_policy_implies_retry() {
        let policy = RetryPolicy {
            retries: 1,
            base_delay: Duration::from_millis(5),
        };

        let spec = RequestSpec::new(Method::GET, "/ping").retry_policy(policy);

        assert!(spec.retry);
        assert_eq!(spec.retry_policy, Some(policy));
    }

    #[test]
    fn queue_route_is_recorded() {
        let spec = RequestSpec::new(Method::POST, "/jobs").queue("jobs", None);

        assert_eq!(
            spec.queue_route(),
            Some(&QueueRoute {
                key: "jobs".into(),
                delay: None,
            })
        );
    }

    #[test]
    fn debug_output_omits_hooks() {
        let spec = RequestSpec::new(Method::POST, "/jobs")
            .data(json!({"a": 1}))
            .post_processor(|v| v);

        let rendered = format!("{spec:?}");
        assert!(rendered.contains("/jobs"));
        assert!(!rendered.contains("post_processor"));
    }

    #[test]
    fn debug_output_lists_header_names_without_values() {
        let spec = RequestSpec::new(Method::GET, "/me")
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));

        let rendered = format!("{spec:?}");
        assert!(rendered.contains("authorization"));
        assert!(!rendered.contains("s3cret"));
    }
}
