//! Shallow merge helpers for options and render contexts.

use serde_json::{Map, Value};

/// `base` overlaid with `overlay`; overlay keys win, keys absent from both stay absent.
pub fn merged(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut out = base.clone();
    merge_into(&mut out, overlay);
    out
}

/// Shallow merge of `overlay` into `target`.
pub fn merge_into(target: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        target.insert(key.clone(), value.clone());
    }
}

/// Parse an options attribute value. Must be a JSON object.
pub fn parse_object(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got `{other}`")),
        Err(err) => Err(err.to_string()),
    }
}
