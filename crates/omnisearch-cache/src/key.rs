//! Call arguments and the cache key derived from them.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::encoding::ensure_lossless;
use crate::error::{CacheError, Result};

/// Name of the bypass control parameter. Never part of a cache key.
pub const FORCE_PARAM: &str = "force";

/// Hex SHA-256 digest identifying one argument signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash already-canonical bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Entry file name for this key.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positional and keyword arguments of one cached call, plus the bypass flag.
///
/// Arguments are converted to JSON as they are added. The first conversion
/// failure is kept; it makes [`CallArgs::cache_key`] fail, which in turn makes
/// the call run uncached.
#[derive(Debug, Default)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: BTreeMap<String, Value>,
    force: bool,
    error: Option<String>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match encode(value) {
            Ok(v) => self.positional.push(v),
            Err(e) => self.record_error(format!("positional argument {}: {e}", self.positional.len())),
        }
        self
    }

    /// Set a keyword argument. Order of insertion does not affect the key.
    ///
    /// A keyword named `force` is the bypass flag: a boolean sets it, anything
    /// else is a derivation error.
    pub fn kwarg<T: Serialize + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        let name = name.into();
        match encode(value) {
            Ok(Value::Bool(force)) if name == FORCE_PARAM => self.force = force,
            Ok(_) if name == FORCE_PARAM => {
                self.record_error(format!("keyword argument {FORCE_PARAM} must be a boolean"));
            }
            Ok(v) => {
                self.keyword.insert(name, v);
            }
            Err(e) => self.record_error(format!("keyword argument {name}: {e}")),
        }
        self
    }

    /// Skip lookup, recompute, and refresh today's entry.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn is_forced(&self) -> bool {
        self.force
    }

    /// Derive the cache key from the canonical JSON of `(positional, keyword)`.
    pub fn cache_key(&self) -> Result<CacheKey> {
        if let Some(err) = &self.error {
            return Err(CacheError::KeyDerivation(err.clone()));
        }
        let bytes = serde_json::to_vec(&(&self.positional, &self.keyword))?;
        Ok(CacheKey::from_bytes(&bytes))
    }

    fn record_error(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }
}

/// Canonical JSON for one argument. Values JSON cannot represent exactly
/// (non-finite floats) are rejected rather than collapsed into `null`.
fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    ensure_lossless(value)?;
    Ok(canonicalize(serde_json::to_value(value)?))
}

/// Rebuild objects with sorted keys so the encoding never depends on the
/// map type the caller used.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
