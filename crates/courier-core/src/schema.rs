//! Schema contract applied to request bodies, params and responses.
//!
//! A [`Schema`] parses a JSON value and returns the (possibly transformed)
//! value it accepts. Two adapters are provided:
//!
//! - [`TypedSchema`] decodes into a `serde` type, runs its `validator`
//!   rules and re-encodes it, so defaults and renames apply to the output.
//! - [`schema_fn`] wraps a plain closure.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use crate::error::SchemaError;

/// Parses and validates a JSON payload.
pub trait Schema: Send + Sync {
    /// Accept `value` (returning the parsed output) or reject it.
    fn parse(&self, value: Value) -> Result<Value, SchemaError>;
}

// ---------------------------------------------------------------------------
// TypedSchema
// ---------------------------------------------------------------------------

/// Schema backed by a `serde` + `validator` type.
///
/// ```rust
/// use courier_core::{Schema, TypedSchema};
/// use serde::{Deserialize, Serialize};
/// use validator::Validate;
///
/// #[derive(Serialize, Deserialize, Validate)]
/// struct NewUser {
///     #[validate(length(min = 1))]
///     name: String,
/// }
///
/// let schema = TypedSchema::<NewUser>::new();
/// assert!(schema.parse(serde_json::json!({"name": "x"})).is_ok());
/// assert!(schema.parse(serde_json::json!({"name": ""})).is_err());
/// ```
pub struct TypedSchema<T> {
    _shape: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    pub fn new() -> Self {
        Self {
            _shape: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSchema")
            .field("shape", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Schema for TypedSchema<T>
where
    T: DeserializeOwned + Serialize + Validate,
{
    fn parse(&self, value: Value) -> Result<Value, SchemaError> {
        let typed: T = serde_json::from_value(value)?;
        typed.validate()?;
        Ok(serde_json::to_value(&typed)?)
    }
}

// ---------------------------------------------------------------------------
// FnSchema
// ---------------------------------------------------------------------------

/// Schema backed by a closure. Built with [`schema_fn`].
pub struct FnSchema<F> {
    parse: F,
}

/// Wrap a closure as a [`Schema`].
pub fn schema_fn<F>(parse: F) -> FnSchema<F>
where
    F: Fn(Value) -> Result<Value, SchemaError> + Send + Sync,
{
    FnSchema { parse }
}

impl<F> Schema for FnSchema<F>
where
    F: Fn(Value) -> Result<Value, SchemaError> + Send + Sync,
{
    fn parse(&self, value: Value) -> Result<Value, SchemaError> {
        (self.parse)(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, Validate)]
    struct Named {
        #[validate(length(min = 1, max = 16))]
        name: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    #[test]
    fn typed_schema_accepts_and_normalises() {
        let schema = TypedSchema::<Named>::new();

        let out = schema.parse(json!({"name": "x"})).unwrap();

        assert_eq!(out, json!({"name": "x", "tags": []}));
    }

    #[test]
    fn typed_schema_drops_unknown_fields() {
        let schema = TypedSchema::<Named>::new();

        let out = schema.parse(json!({"name": "x", "extra": 1})).unwrap();

        assert!(out.get("extra").is_none());
    }

    #[test]
    fn typed_schema_rejects_wrong_shape() {
        let schema = TypedSchema::<Named>::new();
        assert_matches!(schema.parse(json!({"name": 5})), Err(SchemaError::Decode(_)));
    }

    #[test]
    fn typed_schema_rejects_failed_rules() {
        let schema = TypedSchema::<Named>::new();
        assert_matches!(schema.parse(json!({"name": ""})), Err(SchemaError::Invalid(_)));
    }

    #[test]
    fn fn_schema_delegates_to_closure() {
        let schema = schema_fn(|value: Value| match value.as_i64() {
            Some(n) if n > 0 => Ok(json!(n * 2)),
            _ => Err(SchemaError::Rejected("expected a positive integer".into())),
        });

        assert_eq!(schema.parse(json!(4)).unwrap(), json!(8));
        assert_matches!(schema.parse(json!(-1)), Err(SchemaError::Rejected(_)));
    }

    #[test]
    fn error_display() {
        let err = SchemaError::Rejected("nope".into());
        assert_eq!(err.to_string(), "Payload rejected: nope");
    }
}
