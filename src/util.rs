//! Dot-path access over the session attribute map
//!
//! Paths like `"a.b.c"` address nested JSON objects. Writing through a
//! path creates the intermediate objects it needs; a non-object value
//! sitting in the middle of the path is replaced by an object.

use serde_json::{Map, Value};

/// Resolve a dot-path against a map, returning the addressed value.
pub fn dot_get<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = map.get(first)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

/// Set a value at a dot-path, creating intermediate objects as needed.
pub fn dot_set(map: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, intermediate) = match segments.split_last() {
        Some(parts) => parts,
        None => return,
    };

    let mut current = map;
    for segment in intermediate {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut().unwrap();
    }

    current.insert(last.to_string(), value);
}

/// Deep-merge `incoming` into `existing`, keeping `existing` values on
/// conflict. Only object-vs-object collisions recurse; any other clash
/// leaves the existing value untouched.
pub fn merge_keep_existing(existing: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match existing.get_mut(&key) {
            None => {
                existing.insert(key, value);
            }
            Some(current) => {
                if let (Some(current_obj), Value::Object(incoming_obj)) =
                    (current.as_object_mut(), value)
                {
                    merge_keep_existing(current_obj, incoming_obj);
                }
            }
        }
    }
}
