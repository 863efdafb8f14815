//! Generic Document Decoding
//!
//! Decodes YAML text into a [`serde_json::Value`] tree and provides the
//! lenient field accessors the parser uses to coerce that tree into typed
//! entities. Missing or wrong-typed optional fields fall back to defaults;
//! only undecodable text and non-mapping roots are errors.

use serde_json::{Map, Value};

use crate::error::ParseError;

/// Free-form mapping attached to entities (`meta`, `docs`, `grants`, ...).
pub type Metadata = Map<String, Value>;

/// Decode YAML text into a generic tree.
///
/// Blank or comment-only text decodes to `Value::Null`.
pub fn decode_yaml(text: &str) -> Result<Value, ParseError> {
    if is_blank_document(text) {
        return Ok(Value::Null);
    }
    serde_yaml::from_str::<Value>(text).map_err(|e| ParseError::malformed(e.to_string()))
}

/// Decode YAML text whose root must be a mapping.
///
/// `Null` roots (empty documents) yield an empty mapping.
pub fn decode_mapping(text: &str) -> Result<Metadata, ParseError> {
    match decode_yaml(text)? {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(ParseError::malformed(format!(
            "expected a mapping at the document root, found {}",
            value_kind(&other)
        ))),
    }
}

fn is_blank_document(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

/// Short name of a value's shape, used in error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Render a scalar as text. Numbers and booleans are stringified.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Optional text field.
pub fn text(map: &Metadata, key: &str) -> Option<String> {
    map.get(key).and_then(as_text)
}

/// Text field with a default.
pub fn text_or(map: &Metadata, key: &str, default: &str) -> String {
    text(map, key).unwrap_or_else(|| default.to_string())
}

/// List of strings. A bare scalar is treated as a one-element list;
/// non-scalar list items are dropped.
pub fn string_list(map: &Metadata, key: &str) -> Option<Vec<String>> {
    match map.get(key)? {
        Value::Array(items) => Some(items.iter().filter_map(as_text).collect()),
        Value::Null => None,
        scalar => as_text(scalar).map(|s| vec![s]),
    }
}

/// List of strings with a default.
pub fn string_list_or(map: &Metadata, key: &str, default: &[&str]) -> Vec<String> {
    string_list(map, key).unwrap_or_else(|| default.iter().map(|s| s.to_string()).collect())
}

/// Nested mapping, empty when absent or not a mapping.
pub fn mapping(map: &Metadata, key: &str) -> Metadata {
    optional_mapping(map, key).unwrap_or_default()
}

/// Nested mapping, `None` when absent or not a mapping.
pub fn optional_mapping(map: &Metadata, key: &str) -> Option<Metadata> {
    match map.get(key) {
        Some(Value::Object(inner)) => Some(inner.clone()),
        _ => None,
    }
}

/// Items of a list field, empty when absent or not a list.
pub fn list<'a>(map: &'a Metadata, key: &str) -> &'a [Value] {
    match map.get(key) {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

/// Boolean field.
pub fn boolean(map: &Metadata, key: &str) -> Option<bool> {
    match map.get(key) {
        Some(Value::Bool(b)) => Some(*b),
        _ => None,
    }
}

/// Integer field.
pub fn integer(map: &Metadata, key: &str) -> Option<i64> {
    match map.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}
