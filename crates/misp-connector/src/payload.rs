//! Request payload filtering.
//!
//! MISP treats a present-but-empty field differently from a missing one, so
//! payloads are stripped of empty values before they are serialized.

use crate::traits::{ConnectorError, ConnectorResult};
use serde_json::{Map, Value};
use tracing::debug;

/// Returns whether a JSON value counts as "set".
///
/// `null`, `false`, `""`, numeric zero, `[]` and `{}` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Filters a payload for sending.
///
/// Booleans are always kept, including `false`. Every other falsy value is
/// dropped. A negative `page` or a non-positive `limit` is rejected.
pub fn build_payload(payload: Map<String, Value>) -> ConnectorResult<Map<String, Value>> {
    let logged = Value::Object(payload.clone());
    debug!(payload = %logged, "Query parameters");

    let mut data = Map::with_capacity(payload.len());
    for (key, value) in payload {
        if is_truthy(&value) {
            if let Some(n) = value.as_f64() {
                if (key == "page" && n < 0.0) || (key == "limit" && n <= 0.0) {
                    return Err(ConnectorError::Validation(format!(
                        "Value {} of {} parameter is invalid.",
                        value, key
                    )));
                }
            }
        }

        if value.is_boolean() || is_truthy(&value) {
            data.insert(key, value);
        }
    }
    Ok(data)
}
