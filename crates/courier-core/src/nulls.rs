//! Recursive removal of `null` fields from JSON payloads.
//!
//! Callers frequently build request bodies from optional values; many
//! upstream APIs treat an explicit `null` differently from an absent
//! field. [`strip_nulls`] produces a copy of a payload with every
//! `null`-valued object field removed, at any depth, without touching the
//! original.

use serde_json::Value;

use crate::error::StripError;

/// Maximum container nesting the stripper will walk.
///
/// Matches the default recursion limit of `serde_json`'s parser, so any
/// payload that came off the wire fits.
pub const MAX_STRIP_DEPTH: usize = 128;

/// How `null` elements inside arrays are treated.
///
/// Object fields are always removed; array elements have a position, so
/// dropping them shifts every later index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrayNulls {
    /// Leave `null` elements in place. Objects inside the array are still
    /// stripped.
    #[default]
    Keep,
    /// Drop `null` elements, compacting the array.
    Remove,
}

/// Return a copy of `value` with all `null` object fields removed.
///
/// Arrays keep their `null` elements (see [`ArrayNulls::Keep`]).
pub fn strip_nulls(value: &Value) -> Result<Value, StripError> {
    strip_nulls_with(value, ArrayNulls::default())
}

/// Return a copy of `value` with all `null` object fields removed, using
/// `arrays` to decide what happens to `null` array elements.
pub fn strip_nulls_with(value: &Value, arrays: ArrayNulls) -> Result<Value, StripError> {
    let mut stripped = value.clone();
    strip_in_place(&mut stripped, arrays, 0)?;
    Ok(stripped)
}

fn strip_in_place(value: &mut Value, arrays: ArrayNulls, depth: usize) -> Result<(), StripError> {
    match value {
        Value::Object(map) => {
            check_depth(depth)?;
            map.retain(|_, field| !field.is_null());
            for field in map.values_mut() {
                strip_in_place(field, arrays, depth + 1)?;
            }
        }
        Value::Array(items) => {
            check_depth(depth)?;
            if arrays == ArrayNulls::Remove {
                items.retain(|item| !item.is_null());
            }
            for item in items.iter_mut() {
                strip_in_place(item, arrays, depth + 1)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn check_depth(depth: usize) -> Result<(), StripError> {
    if depth >= MAX_STRIP_DEPTH {
        return Err(StripError::TooDeep {
            limit: MAX_STRIP_DEPTH,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
