//! Merging request overrides into template default data.

use serde_json::{Map, Value};

use crate::error::RequestError;

/// Parse the raw body of a template request into a JSON value.
///
/// An empty (or whitespace-only) body means "no overrides" and yields `{}`.
pub fn parse_overrides(body: &[u8]) -> Result<Value, RequestError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| RequestError::InvalidJson(e.to_string()))
}

/// Shallow-merge `overrides` on top of `defaults`.
///
/// Every default key survives unless the overrides contain the same key, in
/// which case the override value replaces it wholesale. Nested objects are
/// not merged recursively. Default keys keep their position; new keys are
/// appended in request order.
///
/// # Errors
///
/// Returns [`RequestError::NotAnObject`] if `overrides` is not a JSON object.
pub fn merge_data(
    mut defaults: Map<String, Value>,
    overrides: Value,
) -> Result<Map<String, Value>, RequestError> {
    let Value::Object(overrides) = overrides else {
        return Err(RequestError::NotAnObject {
            found: json_kind(&overrides),
        });
    };

    defaults.extend(overrides);
    Ok(defaults)
}

/// Short name of a JSON value's type, used in error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
