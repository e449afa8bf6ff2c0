use serde_json::{Map, Value};

/// Deep merge of two JSON values. Mappings merge key by key, recursing where
/// both sides hold a mapping; any other overlay value wins wholesale. An
/// explicit null in the overlay overwrites the base entry.
pub fn merge_deep(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in overlay_map {
                match (merged.get(key), value) {
                    (Some(existing @ Value::Object(_)), Value::Object(_)) => {
                        let combined = merge_deep(existing, value);
                        merged.insert(key.clone(), combined);
                    }
                    _ => {
                        merged.insert(key.clone(), value.clone());
                    }
                }
            }
            Value::Object(merged)
        }
        (_, Value::Null) => base.clone(),
        _ => overlay.clone(),
    }
}
