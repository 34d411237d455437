//! Courier core building blocks.
//!
//! Pure, transport-agnostic pieces shared by the queue and the client:
//!
//! - [`nulls`] — clone-and-strip of `null` fields before validation.
//! - [`schema`] — the [`Schema`] contract applied to bodies, params and
//!   responses, plus adapters over `serde` + `validator`.
//! - [`error`] — error types for the two modules above.

pub mod error;
pub mod nulls;
pub mod schema;

pub use error::{SchemaError, StripError};
pub use nulls::{strip_nulls, strip_nulls_with, ArrayNulls};
pub use schema::{schema_fn, Schema, TypedSchema};
