/// Errors raised when a [`Schema`](crate::Schema) rejects a payload.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The payload could not be decoded into (or re-encoded from) the
    /// schema's shape.
    #[error("Payload does not match schema shape: {0}")]
    Decode(#[from] serde_json::Error),

    /// The payload decoded but failed field-level validation.
    #[error("Payload failed validation: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    /// A hand-written schema refused the payload.
    #[error("Payload rejected: {0}")]
    Rejected(String),
}

/// Errors raised by the null stripper.
#[derive(Debug, thiserror::Error)]
pub enum StripError {
    #[error("Payload nesting exceeds {limit} levels")]
    TooDeep { limit: usize },
}
