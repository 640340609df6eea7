//! Normalization of Move values as they appear in JSON-RPC responses.
//!
//! The same logical field can arrive as `{"fields": {...}}` or bare, ids can be plain
//! strings or nested under `id`/`bytes`, integers can be JSON numbers or decimal
//! strings, and `Option`/`vector` values can be wrapped in `{"vec": [...]}`. Everything
//! above this module works with the normalized forms only.

use crate::ids::{
    Address,
    ObjectId,
};
use serde_json::{
    Map,
    Value,
};

pub type Fields = Map<String, Value>;

/// Unwraps a `{"fields": {...}}` wrapper, returning the inner map or the object itself.
pub fn normalize_fields(value: &Value) -> Option<&Fields> {
    let record = value.as_object()?;
    match record.get("fields") {
        Some(Value::Object(inner)) => Some(inner),
        _ => Some(record),
    }
}

/// First non-null field among `names` (snake_case and camelCase aliases).
pub fn field<'a>(fields: &'a Fields, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|value| !value.is_null())
}

pub fn string_field(fields: &Fields, names: &[&str]) -> Option<String> {
    field(fields, names)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Extracts an object id from a plain string or from the nested `id`/`bytes` shapes.
pub fn object_id(value: &Value) -> Option<ObjectId> {
    raw_id(value, 0)?.parse().ok()
}

pub fn address(value: &Value) -> Option<Address> {
    raw_id(value, 0)?.parse().ok()
}

fn raw_id(value: &Value, depth: u8) -> Option<&str> {
    if depth > 3 {
        return None;
    }
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Object(record) => {
            if let Some(Value::String(bytes)) = record.get("bytes") {
                return Some(bytes);
            }
            if let Some(id) = record.get("id") {
                if let Some(found) = raw_id(id, depth + 1) {
                    return Some(found);
                }
            }
            match record.get("fields") {
                Some(inner) => raw_id(inner, depth + 1),
                None => None,
            }
        }
        _ => None,
    }
}

/// Exact unsigned integer from a JSON number or a decimal string.
pub fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Lenient byte decode used for tile and decoration codes: fractional values are
/// floored, negatives become zero and anything above 255 saturates.
pub fn clamped_u8(value: &Value) -> u8 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    };
    match parsed {
        Some(v) if v <= 0.0 => 0,
        Some(v) if v >= 255.0 => 255,
        Some(v) => v.floor() as u8,
        None => 0,
    }
}

/// A Move `vector` or `Option`, either a bare array or wrapped in `{"vec": [...]}`.
pub fn vector(value: &Value) -> &[Value] {
    if let Value::Array(items) = value {
        return items;
    }
    match normalize_fields(value).and_then(|fields| fields.get("vec")) {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}
