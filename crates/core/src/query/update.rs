//! Update evaluation.
//!
//! Supported operators: `$set`, `$unset`, `$inc`, `$push`. An update without
//! operators replaces the document body, keeping `_id`.

use serde_json::{Map, Number, Value};

use crate::storage::{Document, RepositoryError, Result, Update, ID_FIELD};

use super::compare::values_equal;
use super::path::{get_path, remove_path, set_path};

/// Applies `update` to a copy of `document` and returns the result.
///
/// Whether anything changed is decided by comparing the result with the
/// input document.
pub fn apply_update(document: &Document, update: &Update) -> Result<Document> {
    let Value::Object(update) = update else {
        return Err(RepositoryError::InvalidData(
            "update must be an object".to_string(),
        ));
    };

    let operators = update.keys().filter(|k| k.starts_with('$')).count();
    if operators == 0 {
        return replace(document, update);
    }
    if operators != update.len() {
        return Err(RepositoryError::InvalidData(
            "update mixes operators and plain fields".to_string(),
        ));
    }

    let mut result = document.clone();
    for (op, fields) in update {
        let Value::Object(fields) = fields else {
            return Err(RepositoryError::InvalidData(format!(
                "{op} expects an object"
            )));
        };
        for (path, operand) in fields {
            guard_id(document, path, op, operand)?;
            match op.as_str() {
                "$set" => set(&mut result, path, operand.clone())?,
                "$unset" => {
                    remove_path(&mut result, path);
                }
                "$inc" => increment(&mut result, path, operand)?,
                "$push" => push(&mut result, path, operand)?,
                other => {
                    return Err(RepositoryError::InvalidData(format!(
                        "unsupported update operator {other}"
                    )))
                }
            }
        }
    }
    Ok(result)
}

/// Returns true when the update changed the document.
pub fn is_modified(before: &Document, after: &Document) -> bool {
    before != after
}

fn replace(document: &Document, replacement: &Map<String, Value>) -> Result<Document> {
    let mut result = Map::new();
    if let Some(id) = document.get(ID_FIELD) {
        if let Some(new_id) = replacement.get(ID_FIELD) {
            if !values_equal(id, new_id) {
                return Err(RepositoryError::InvalidData(
                    "replacement cannot change _id".to_string(),
                ));
            }
        }
        result.insert(ID_FIELD.to_string(), id.clone());
    }
    for (key, value) in replacement {
        if key != ID_FIELD {
            result.insert(key.clone(), value.clone());
        }
    }
    Ok(result)
}

fn guard_id(document: &Document, path: &str, op: &str, operand: &Value) -> Result<()> {
    if path != ID_FIELD && !path.starts_with("_id.") {
        return Ok(());
    }
    let unchanged =
        op == "$set" && document.get(ID_FIELD).is_some_and(|id| values_equal(id, operand));
    if unchanged {
        Ok(())
    } else {
        Err(RepositoryError::InvalidData(format!(
            "{op} cannot modify _id"
        )))
    }
}

fn set(document: &mut Document, path: &str, value: Value) -> Result<()> {
    if set_path(document, path, value) {
        Ok(())
    } else {
        Err(RepositoryError::InvalidData(format!(
            "cannot set {path}: a parent is not an object"
        )))
    }
}

fn increment(document: &mut Document, path: &str, operand: &Value) -> Result<()> {
    let Value::Number(delta) = operand else {
        return Err(RepositoryError::InvalidData(format!(
            "$inc on {path} expects a number"
        )));
    };

    let next = match get_path(document, path) {
        None => Value::Number(delta.clone()),
        Some(Value::Number(current)) => add_numbers(current, delta).ok_or_else(|| {
            RepositoryError::InvalidData(format!("$inc on {path} overflowed"))
        })?,
        Some(_) => {
            return Err(RepositoryError::InvalidData(format!(
                "$inc on non-numeric field {path}"
            )))
        }
    };
    set(document, path, next)
}

fn add_numbers(a: &Number, b: &Number) -> Option<Value> {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a.checked_add(b).map(Value::from);
    }
    let sum = a.as_f64()? + b.as_f64()?;
    Number::from_f64(sum).map(Value::Number)
}

fn push(document: &mut Document, path: &str, operand: &Value) -> Result<()> {
    let next = match get_path(document, path) {
        None => Value::Array(vec![operand.clone()]),
        Some(Value::Array(items)) => {
            let mut items = items.clone();
            items.push(operand.clone());
            Value::Array(items)
        }
        Some(_) => {
            return Err(RepositoryError::InvalidData(format!(
                "$push on non-array field {path}"
            )))
        }
    };
    set(document, path, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test documents are objects"),
        }
    }

    fn person() -> Document {
        doc(json!({ "_id": "65a1f0c2e4b0a1b2c3d4e5f6", "name": "x", "visits": 1 }))
    }

    #[test]
    fn test_set_changes_field() {
        let before = person();
        let after = apply_update(&before, &json!({ "$set": { "name": "y" } })).unwrap();

        assert_eq!(after.get("name"), Some(&json!("y")));
        assert!(is_modified(&before, &after));
    }

    #[test]
    fn test_set_same_value_is_not_modified() {
        let before = person();
        let after = apply_update(&before, &json!({ "$set": { "name": "x" } })).unwrap();

        assert!(!is_modified(&before, &after));
    }

    #[test]
    fn test_unset_and_missing_unset() {
        let before = person();
        let after = apply_update(&before, &json!({ "$unset": { "visits": "" } })).unwrap();
        assert!(after.get("visits").is_none());

        let again = apply_update(&after, &json!({ "$unset": { "visits": "" } })).unwrap();
        assert!(!is_modified(&after, &again));
    }

    #[test]
    fn test_inc() {
        let after = apply_update(&person(), &json!({ "$inc": { "visits": 2, "score": 1.5 } }))
            .unwrap();
        assert_eq!(after.get("visits"), Some(&json!(3)));
        assert_eq!(after.get("score"), Some(&json!(1.5)));
    }

    #[test]
    fn test_inc_non_numeric_fails() {
        let err = apply_update(&person(), &json!({ "$inc": { "name": 1 } })).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidData(_)));
    }

    #[test]
    fn test_push() {
        let after = apply_update(&person(), &json!({ "$push": { "tags": "a" } })).unwrap();
        let after = apply_update(&after, &json!({ "$push": { "tags": "b" } })).unwrap();
        assert_eq!(after.get("tags"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_replacement_keeps_id() {
        let after = apply_update(&person(), &json!({ "name": "y" })).unwrap();
        assert_eq!(
            Value::Object(after),
            json!({ "_id": "65a1f0c2e4b0a1b2c3d4e5f6", "name": "y" })
        );
    }

    #[test]
    fn test_cannot_change_id() {
        let err = apply_update(&person(), &json!({ "$set": { "_id": "ffffffffffffffffffffffff" } }))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidData(_)));

        let err =
            apply_update(&person(), &json!({ "_id": "ffffffffffffffffffffffff" })).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidData(_)));
    }

    #[test]
    fn test_mixed_update_fails() {
        let err = apply_update(&person(), &json!({ "$set": { "a": 1 }, "b": 2 })).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidData(_)));
    }

    #[test]
    fn test_unsupported_operator_fails() {
        let err = apply_update(&person(), &json!({ "$rename": { "name": "n" } })).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidData(_)));
    }
}
