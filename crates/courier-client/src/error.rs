use courier_core::{SchemaError, StripError};

use crate::transport::TransportError;

/// Failure of one orchestrated call.
///
/// Validation failures (`Strip`, `Body`, `Params`, `Merge`,
/// `ParamsNotObject`) happen before any network activity.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Could not strip nulls from request: {0}")]
    Strip(#[from] StripError),

    #[error("Request body failed validation: {0}")]
    Body(#[source] SchemaError),

    #[error("Request params failed validation: {0}")]
    Params(#[source] SchemaError),

    #[error("Cannot merge extra fields into {part}: both must be JSON objects")]
    Merge { part: &'static str },

    #[error("Request params must be a JSON object, got {kind}")]
    ParamsNotObject { kind: &'static str },

    /// The transport failed and no error handler recovered it. Queued
    /// calls surface the task's error here unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A queued call ended without producing a transport result.
    #[error("Queued request did not complete: {0}")]
    Queue(String),

    /// The response was rejected by the output schema.
    #[error(transparent)]
    Output(SchemaError),

    #[error("Response could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}
