//! Validation and canonicalization of per-host advanced Caddy JSON.
//!
//! Operators paste raw Caddy handler JSON into a host. Caddy expects
//! header values as arrays of strings, but people routinely write
//! `{"set": {"X-Frame-Options": "DENY"}}`. The normalizer accepts that
//! shorthand and rewrites it before the snippet is stored.

use serde_json::{Map, Value};

use crate::error::CoreError;

/// Handler name whose header maps get normalized.
const HEADERS_HANDLER: &str = "headers";

/// Header operation maps whose values must be string arrays.
const HEADER_VALUE_OPS: &[&str] = &["set", "add"];

/// Normalize an advanced config snippet.
///
/// - Blank input returns `Ok(None)` (the snippet is cleared).
/// - The snippet must be a JSON object or an array of objects.
/// - Every `headers` handler, at any depth, has its `set`/`add` string
///   values wrapped into one-element arrays and a bare `delete` string
///   wrapped into an array.
/// - The result is re-serialized as compact JSON.
pub fn normalize_advanced_config(raw: &str) -> Result<Option<String>, CoreError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let mut value: Value = serde_json::from_str(raw)
        .map_err(|e| CoreError::Validation(format!("Advanced config is not valid JSON: {e}")))?;

    match &value {
        Value::Object(_) => {}
        Value::Array(items) if items.iter().all(Value::is_object) => {}
        _ => {
            return Err(CoreError::Validation(
                "Advanced config must be a JSON object or an array of objects".into(),
            ))
        }
    }

    normalize_value(&mut value);

    serde_json::to_string(&value)
        .map(Some)
        .map_err(|e| CoreError::Internal(format!("Failed to serialize advanced config: {e}")))
}

/// Parse a stored (already normalized) snippet back into handler values.
///
/// A single object becomes a one-element list.
pub fn advanced_config_handlers(stored: &str) -> Result<Vec<Value>, CoreError> {
    let value: Value = serde_json::from_str(stored)
        .map_err(|e| CoreError::Validation(format!("Advanced config is not valid JSON: {e}")))?;
    Ok(match value {
        Value::Array(items) => items,
        other => vec![other],
    })
}

fn normalize_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("handler").and_then(Value::as_str) == Some(HEADERS_HANDLER) {
                normalize_headers_handler(map);
            }
            for child in map.values_mut() {
                normalize_value(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_value),
        _ => {}
    }
}

fn normalize_headers_handler(handler: &mut Map<String, Value>) {
    for side in ["request", "response"] {
        if let Some(Value::Object(ops)) = handler.get_mut(side) {
            normalize_header_ops(ops);
        }
    }
}

fn normalize_header_ops(ops: &mut Map<String, Value>) {
    for op in HEADER_VALUE_OPS {
        if let Some(Value::Object(headers)) = ops.get_mut(*op) {
            for value in headers.values_mut() {
                wrap_scalar(value);
            }
        }
    }
    if let Some(delete) = ops.get_mut("delete") {
        if delete.is_string() {
            wrap_scalar(delete);
        }
    }
}

/// Turn a scalar into a one-element array of strings. Arrays get their
/// scalar members stringified; `null` becomes an empty array.
fn wrap_scalar(value: &mut Value) {
    let replacement = match value.take() {
        Value::Array(items) => Value::Array(items.into_iter().map(stringify).collect()),
        Value::Null => Value::Array(vec![]),
        scalar => Value::Array(vec![stringify(scalar)]),
    };
    *value = replacement;
}

fn stringify(value: Value) -> Value {
    match value {
        Value::String(_) => value,
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Number(n) => Value::String(n.to_string()),
        other => other,
    }
}
