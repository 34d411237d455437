//! The request pipeline.
//!
//! [`Orchestrator::execute`] runs one [`RequestSpec`] through a fixed
//! sequence of stages:
//!
//! 1. resolve the body: strip nulls, then validate against its schema;
//! 2. resolve the params the same way;
//! 3. merge extra body/params fields onto the validated values and check
//!    that the params can become a query string;
//! 4. pick the transport and wrap it in a per-call retry when asked;
//! 5. dispatch, directly or through the lane for the request's queue key,
//!    with the error handler as a recovery hook;
//! 6. pre-process the response;
//! 7. validate it against the output schema;
//! 8. post-process it.
//!
//! Apart from the shared [`LaneRegistry`], the orchestrator keeps no
//! state between calls.

use std::sync::Arc;

use courier_core::{strip_nulls, Schema, SchemaError};
use courier_queue::{LaneRegistry, TaskError};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::CourierConfig;
use crate::error::RequestError;
use crate::request::RequestSpec;
use crate::retry::{send_with_retry, RetryPolicy};
use crate::transport::{
    default_headers, json_kind, ReqwestTransport, Transport, TransportError, TransportRequest,
};

/// Composes validation, queuing, retry and response handling around a
/// [`Transport`].
///
/// Cheap to share: wrap it in an `Arc` or clone it.
#[derive(Clone)]
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    lanes: Arc<LaneRegistry>,
    retry_policy: RetryPolicy,
}

impl Orchestrator {
    /// Create an orchestrator over a shared transport and lane registry.
    pub fn new(transport: Arc<dyn Transport>, lanes: Arc<LaneRegistry>) -> Self {
        Self {
            transport,
            lanes,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Build a [`ReqwestTransport`] and a fresh [`LaneRegistry`] from
    /// `config`.
    pub fn from_config(config: &CourierConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::with_timeout(config.http_timeout)?;
        let lanes = LaneRegistry::with_default_delay(config.lane_delay);
        Ok(Self::new(Arc::new(transport), Arc::new(lanes)).with_retry_policy(config.retry))
    }

    /// Policy used by specs that ask for retry without naming one.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn lanes(&self) -> &Arc<LaneRegistry> {
        &self.lanes
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Run `spec` and return the final (validated, post-processed) value.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Value, RequestError> {
        tracing::debug!(method = %spec.method, url = %spec.url, "Resolving request payload");

        let body = resolve_part(
            spec.data.as_ref(),
            spec.data_schema.as_deref(),
            spec.remove_nulls,
            RequestError::Body,
        )?;

        let params = resolve_part(
            spec.params.as_ref(),
            spec.params_schema.as_deref(),
            spec.remove_nulls,
            RequestError::Params,
        )?;

        let body = merge_extra("body", body, spec.extra_body.as_ref())?;
        let params = merge_extra("params", params, spec.extra_params.as_ref())?;
        ensure_object_params(params.as_ref())?;

        let request = TransportRequest {
            method: spec.method.clone(),
            url: spec.url.clone(),
            base_url: spec.base_url.clone(),
            headers: spec.headers.clone().unwrap_or_else(default_headers),
            body: body.filter(|b| !b.is_null()),
            params: params.filter(|p| !p.is_null()),
            response_type: spec.response_type,
        };

        let raw = self.dispatch(spec, request).await?;

        let processed = match &spec.pre_processor {
            Some(pre) => pre(raw),
            None => raw,
        };

        let validated = match &spec.output_schema {
            Some(schema) => schema.parse(processed).map_err(|e| {
                tracing::debug!(
                    method = %spec.method,
                    url = %spec.url,
                    error = %e,
                    "Response rejected by output schema",
                );
                RequestError::Output(e)
            })?,
            None => processed,
        };

        Ok(match &spec.post_processor {
            Some(post) => post(validated),
            None => validated,
        })
    }

    /// Run `spec` and decode the final value into `T`.
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        spec: &RequestSpec,
    ) -> Result<T, RequestError> {
        let value = self.execute(spec).await?;
        serde_json::from_value(value).map_err(RequestError::Decode)
    }

    async fn dispatch(
        &self,
        spec: &RequestSpec,
        request: TransportRequest,
    ) -> Result<Value, RequestError> {
        let transport = spec
            .transport
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.transport));
        let retry = spec
            .retry
            .then(|| spec.retry_policy.unwrap_or(self.retry_policy));
        let error_handler = spec.error_handler.clone();

        let call = move || async move {
            let result = match retry {
                Some(policy) => send_with_retry(transport.as_ref(), &request, &policy).await,
                None => transport.send(&request).await,
            };

            match (result, error_handler) {
                (Err(e), Some(handler)) => {
                    tracing::debug!(
                        method = %request.method,
                        url = %request.url,
                        error = %e,
                        "Passing transport failure to error handler",
                    );
                    handler(e)
                }
                (result, _) => result,
            }
        };

        match &spec.queue {
            Some(route) => {
                tracing::debug!(key = %route.key, url = %spec.url, "Queueing request");
                self.lanes
                    .submit(&route.key, call, route.delay)
                    .await
                    .map_err(|e| match e {
                        TaskError::Failed(e) => RequestError::Transport(e),
                        other => RequestError::Queue(other.to_string()),
                    })
            }
            None => Ok(call().await?),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("lanes", &self.lanes.len())
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

// ---- private helpers ----

/// Resolve a body or params value.
///
/// Without a schema the raw value is used as-is. With one, the value is
/// optionally null-stripped and then parsed; a missing value is parsed as
/// `null`. Schema rejections are wrapped with `reject`.
fn resolve_part(
    raw: Option<&Value>,
    schema: Option<&dyn Schema>,
    remove_nulls: bool,
    reject: fn(SchemaError) -> RequestError,
) -> Result<Option<Value>, RequestError> {
    let Some(schema) = schema else {
        return Ok(raw.cloned());
    };

    let input = match raw {
        Some(value) if remove_nulls => strip_nulls(value)?,
        Some(value) => value.clone(),
        None => Value::Null,
    };

    schema.parse(input).map(Some).map_err(reject)
}

/// Shallow-merge `extra` onto `base`; keys from `extra` win.
///
/// Nothing is merged when `base` is absent or `null`.
fn merge_extra(
    part: &'static str,
    base: Option<Value>,
    extra: Option<&Value>,
) -> Result<Option<Value>, RequestError> {
    match (base, extra) {
        (Some(Value::Object(mut target)), Some(Value::Object(fields))) => {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
            Ok(Some(Value::Object(target)))
        }
        (Some(base), Some(_)) if !base.is_null() => Err(RequestError::Merge { part }),
        (base, _) => Ok(base),
    }
}

/// Params become a query string, so anything but an object (or nothing)
/// is the caller's mistake and never reaches the transport.
fn ensure_object_params(params: Option<&Value>) -> Result<(), RequestError> {
    match params {
        None | Some(Value::Null) | Some(Value::Object(_)) => Ok(()),
        Some(other) => Err(RequestError::ParamsNotObject {
            kind: json_kind(other),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
