//! Canonical JSON and SHA-256 fingerprints of definition configurations.
//!
//! Two configurations that differ only in object key order, or in writing
//! `18` versus `18.0`, canonicalize to the same string and therefore the
//! same fingerprint.

use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use crate::domain::error::CacheAccessError;

/// Rebuild `value` with integer-valued floats rewritten as integers.
///
/// Object keys come out in byte order, since `serde_json::Map` is sorted.
fn canonicalize(value: &Value) -> Result<Value, CacheAccessError> {
    match value {
        Value::Object(map) => {
            let mut sorted = Map::new();
            for (key, item) in map {
                sorted.insert(key.clone(), canonicalize(item)?);
            }
            Ok(Value::Object(sorted))
        }
        Value::Array(items) => items
            .iter()
            .map(canonicalize)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Number(n) if n.is_f64() => {
            let f = n.as_f64().unwrap_or(f64::NAN);
            if !f.is_finite() {
                return Err(CacheAccessError::KeyDerivation(
                    "non-finite number in configuration".to_string(),
                ));
            }
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(Value::Number(Number::from(f as i64)))
            } else {
                Ok(value.clone())
            }
        }
        other => Ok(other.clone()),
    }
}

/// Compact canonical JSON text for `value`.
pub fn canonical_json(value: &Value) -> Result<String, CacheAccessError> {
    let canonical = canonicalize(value)?;
    serde_json::to_string(&canonical).map_err(|e| CacheAccessError::KeyDerivation(e.to_string()))
}

/// Lowercase hex SHA-256 of the canonical JSON of `value`.
pub fn fingerprint(value: &Value) -> Result<String, CacheAccessError> {
    let canonical = canonical_json(value)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}
