//! Courier request orchestration client.
//!
//! Wraps an HTTP [`Transport`] with schema validation, per-key request
//! lanes, per-call retry and response hooks. Entry point:
//! [`Orchestrator::execute`] with a [`RequestSpec`].
//!
//! - [`transport`] — the transport seam and the `reqwest` implementation.
//! - [`retry`] — per-call exponential-backoff decorator.
//! - [`request`] — the [`RequestSpec`] builder.
//! - [`orchestrator`] — the pipeline itself.
//! - [`config`] — environment-driven defaults.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod retry;
pub mod transport;

pub use config::{ConfigError, CourierConfig};
pub use courier_core::{schema_fn, ArrayNulls, Schema, SchemaError, StripError, TypedSchema};
pub use courier_queue::{LaneRegistry, TaskError};
pub use error::RequestError;
pub use orchestrator::Orchestrator;
pub use request::{ErrorHandler, Processor, QueueRoute, RequestSpec};
pub use retry::RetryPolicy;
pub use transport::{Method, ReqwestTransport, ResponseType, Transport, TransportError, TransportRequest};
