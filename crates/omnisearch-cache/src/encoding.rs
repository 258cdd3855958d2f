//! Lossless-encoding check for keys and entries.
//!
//! JSON has no NaN or infinity: `serde_json` writes non-finite floats as
//! `null`, which would make `NaN`, `inf` and `None` hash to the same key and
//! would turn a stored `Some(NaN)` into `None` on the next hit. Values are
//! inspected through a YAML encoding, which keeps those floats, before they
//! are hashed or persisted.

use serde::Serialize;
use serde_yaml::Value;

use crate::error::{CacheError, Result};

/// Fail if `value` would not survive a JSON round trip unchanged.
pub fn ensure_lossless<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let encoded = serde_yaml::to_value(value).map_err(|e| CacheError::Lossy(e.to_string()))?;
    if contains_non_finite(&encoded) {
        return Err(CacheError::Lossy(
            "non-finite float (NaN or infinity) has no JSON encoding".to_string(),
        ));
    }
    Ok(())
}

fn contains_non_finite(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_nan() || n.is_infinite(),
        Value::Sequence(items) => items.iter().any(contains_non_finite),
        Value::Mapping(map) => map
            .iter()
            .any(|(k, v)| contains_non_finite(k) || contains_non_finite(v)),
        Value::Tagged(tagged) => contains_non_finite(&tagged.value),
        Value::Null | Value::Bool(_) | Value::String(_) => false,
    }
}
