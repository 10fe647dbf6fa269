//! Dotted path selection over decoded JSON payloads.
//!
//! Paths use `.` as the separator. Numeric segments index into arrays, and an
//! empty path (or `.`) selects the payload itself.

use serde_json::Value;

/// Select the subtree at `path` within `value`.
///
/// Returns `None` when any segment is missing.
///
/// ```
/// use fathom_types::select_path;
/// use serde_json::json;
///
/// let payload = json!({"data": {"items": [{"id": 1}, {"id": 2}]}});
/// assert_eq!(select_path(&payload, "data.items.1.id"), Some(&json!(2)));
/// assert_eq!(select_path(&payload, "."), Some(&payload));
/// assert!(select_path(&payload, "data.missing").is_none());
/// ```
pub fn select_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Some(value);
    }

    let mut current = value;
    for segment in trimmed.split('.').filter(|segment| !segment.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Interpret a JSON scalar as an unsigned integer.
///
/// Accepts numbers and numeric strings, since pagination counters frequently
/// arrive as strings in headers and loosely typed bodies.
pub fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}
