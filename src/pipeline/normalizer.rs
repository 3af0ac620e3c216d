//! Shared coercions that turn a loosely-shaped payload into typed results.
//! Per-feature normalizers live next to their feature; these are the pieces
//! they have in common.

use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use super::extractor::Payload;
use crate::error::GenerationError;
use crate::util::char_len;

/// Free-text items must be longer than this many characters (after trimming).
pub const MIN_TEXT_CHARS: usize = 3;

pub fn is_substantive(text: &str) -> bool {
    char_len(text) > MIN_TEXT_CHARS
}

pub fn require_payload(payload: Option<Payload>) -> Result<Payload, GenerationError> {
    payload.ok_or_else(|| GenerationError::Extraction("no JSON payload found".to_string()))
}

/// A list feature accepts a bare array, or an object holding the array under
/// one of `keys`, or an object with exactly one array value.
pub fn expect_list(payload: Payload, keys: &[&str]) -> Result<Vec<Value>, GenerationError> {
    match payload {
        Payload::Array(items) => Ok(items),
        Payload::Object(mut map) => {
            if let Some(key) = keys.iter().find(|k| matches!(map.get(**k), Some(Value::Array(_)))) {
                debug!("unwrapping list from object key '{}'", key);
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return Ok(items);
                }
            }
            let mut arrays: Vec<Vec<Value>> = map
                .into_iter()
                .filter_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .collect();
            if arrays.len() == 1 {
                return Ok(arrays.remove(0));
            }
            Err(GenerationError::Extraction(
                "expected a JSON array but found an object".to_string(),
            ))
        }
    }
}

/// An object feature accepts an object, or an array whose first element is one.
pub fn expect_object(payload: Payload) -> Result<Map<String, Value>, GenerationError> {
    match payload {
        Payload::Object(map) => Ok(map),
        Payload::Array(items) => match items.into_iter().next() {
            Some(Value::Object(map)) => {
                debug!("using first object of array payload");
                Ok(map)
            }
            _ => Err(GenerationError::Extraction(
                "expected a JSON object but found an array".to_string(),
            )),
        },
    }
}

/// Objects pass through; a bare string becomes `{ primary: string }`.
pub fn coerce_object(value: Value, primary: &str) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        Value::String(s) => {
            let mut map = Map::new();
            map.insert(primary.to_string(), Value::String(s));
            Some(map)
        }
        other => {
            debug!("dropping non-object item: {}", other);
            None
        }
    }
}

/// Text of a scalar value; numbers and booleans are rendered, null is not.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First present text field among `keys`.
pub fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find_map(scalar_text)
        .filter(|s| !s.is_empty())
}

/// Text of a list item: a string, or an object's first text field among `keys`.
pub fn item_text(value: &Value, keys: &[&str]) -> Option<String> {
    match value {
        Value::Object(map) => text_field(map, keys),
        other => scalar_text(other).filter(|s| !s.is_empty()),
    }
}

/// An array of strings, or a comma-separated string. Anything else is empty.
pub fn string_list(value: Option<&Value>, item_keys: &[&str]) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|v| item_text(v, item_keys)).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// A number, or a string that parses as one.
pub fn number_value(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Like [`number_value`] but keeps integers as integers.
pub fn json_number(value: Option<&Value>) -> Option<Number> {
    if let Some(Value::Number(n)) = value {
        return Some(n.clone());
    }
    let n = number_value(value)?;
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Some(Number::from(n as i64))
    } else {
        Number::from_f64(n)
    }
}

/// Ensure a single leading `#`, trimmed. Returns `None` for an empty tag.
pub fn hashtag(raw: &str) -> Option<String> {
    let tag = raw.trim().trim_start_matches('#').trim();
    if tag.is_empty() {
        None
    } else {
        Some(format!("#{}", tag))
    }
}

/// Keep the first `limit` items, logging how many were cut.
pub fn take_limited<T>(mut items: Vec<T>, limit: usize, what: &str) -> Vec<T> {
    if items.len() > limit {
        warn!("truncating {} {} to {}", items.len(), what, limit);
        items.truncate(limit);
    }
    items
}
