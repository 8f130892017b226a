//! Filter evaluation.
//!
//! A filter is a JSON object whose entries are combined with AND:
//!
//! - `{"field": literal}` matches equal values (any element for arrays);
//!   `null` also matches a missing field
//! - `{"field": {"$op": operand, ...}}` with `$eq $ne $gt $gte $lt $lte
//!   $in $nin $exists`
//! - top-level `$and`, `$or`, `$nor` take arrays of filters
//!
//! Field names may be dotted paths. `null` and `{}` match every document.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::storage::{Document, Filter, RepositoryError, Result};

use super::compare::{compare_same_kind, values_equal};
use super::path::get_path;

/// Returns true when `document` satisfies `filter`.
pub fn matches(document: &Document, filter: &Filter) -> Result<bool> {
    match filter {
        Value::Null => Ok(true),
        Value::Object(conditions) => matches_all(document, conditions),
        other => Err(RepositoryError::InvalidData(format!(
            "filter must be an object, got {other}"
        ))),
    }
}

fn matches_all(document: &Document, conditions: &Map<String, Value>) -> Result<bool> {
    for (key, condition) in conditions {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for sub in sub_filters(key, condition)? {
                    if !matches(document, sub)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for sub in sub_filters(key, condition)? {
                    if matches(document, sub)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for sub in sub_filters(key, condition)? {
                    if matches(document, sub)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            op if op.starts_with('$') => {
                return Err(RepositoryError::InvalidData(format!(
                    "unsupported top-level operator {op}"
                )))
            }
            path => matches_field(get_path(document, path), condition)?,
        };

        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_filters<'a>(op: &str, condition: &'a Value) -> Result<&'a [Value]> {
    match condition {
        Value::Array(items) if !items.is_empty() => Ok(items),
        _ => Err(RepositoryError::InvalidData(format!(
            "{op} expects a non-empty array of filters"
        ))),
    }
}

fn is_operator_object(condition: &Value) -> Option<&Map<String, Value>> {
    match condition {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => {
            Some(map)
        }
        _ => None,
    }
}

fn matches_field(field: Option<&Value>, condition: &Value) -> Result<bool> {
    let Some(operators) = is_operator_object(condition) else {
        return Ok(equals(field, condition));
    };

    for (op, operand) in operators {
        let matched = match op.as_str() {
            "$eq" => equals(field, operand),
            "$ne" => !equals(field, operand),
            "$gt" => ordered(field, operand, |o| o == Ordering::Greater),
            "$gte" => ordered(field, operand, |o| o != Ordering::Less),
            "$lt" => ordered(field, operand, |o| o == Ordering::Less),
            "$lte" => ordered(field, operand, |o| o != Ordering::Greater),
            "$in" => in_list(field, op, operand)?,
            "$nin" => !in_list(field, op, operand)?,
            "$exists" => match operand {
                Value::Bool(expected) => field.is_some() == *expected,
                _ => {
                    return Err(RepositoryError::InvalidData(
                        "$exists expects a boolean".to_string(),
                    ))
                }
            },
            other => {
                return Err(RepositoryError::InvalidData(format!(
                    "unsupported operator {other}"
                )))
            }
        };

        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(value) if values_equal(value, expected) => true,
        Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, expected)),
        Some(_) => false,
    }
}

fn ordered(field: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match field {
        None => false,
        Some(Value::Array(items)) if !operand.is_array() => items
            .iter()
            .any(|item| compare_same_kind(item, operand).is_some_and(&accept)),
        Some(value) => compare_same_kind(value, operand).is_some_and(&accept),
    }
}

fn in_list(field: Option<&Value>, op: &str, operand: &Value) -> Result<bool> {
    match operand {
        Value::Array(candidates) => Ok(candidates.iter().any(|c| equals(field, c))),
        _ => Err(RepositoryError::InvalidData(format!(
            "{op} expects an array"
        ))),
    }
}
