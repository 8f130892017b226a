//! Dotted-path access into JSON documents (`"address.city"`).

use serde_json::{Map, Value};

/// Looks up a dotted path. Numeric segments index into arrays.
pub fn get_path<'a>(document: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = document.get(first)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Sets a dotted path, creating intermediate objects as needed.
///
/// Returns false when an intermediate segment exists but is not an object.
pub fn set_path(document: &mut Map<String, Value>, path: &str, value: Value) -> bool {
    match path.split_once('.') {
        None => {
            document.insert(path.to_string(), value);
            true
        }
        Some((head, rest)) => {
            let child = document
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match child {
                Value::Object(map) => set_path(map, rest, value),
                _ => false,
            }
        }
    }
}

/// Removes a dotted path, returning the removed value.
pub fn remove_path(document: &mut Map<String, Value>, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => document.remove(path),
        Some((head, rest)) => match document.get_mut(head)? {
            Value::Object(map) => remove_path(map, rest),
            _ => None,
        },
    }
}
