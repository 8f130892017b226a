//! Value equality and ordering used by filters and sorting.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Orders two numbers. Integers compare exactly; floats only come into play
/// when one side is not an integer.
fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return Some(x.cmp(&y));
    }
    // A negative integer against one above i64::MAX.
    if x.as_i64().is_some() && y.as_u64().is_some() {
        return Some(Ordering::Less);
    }
    if x.as_u64().is_some() && y.as_i64().is_some() {
        return Some(Ordering::Greater);
    }
    x.as_f64()?.partial_cmp(&y.as_f64()?)
}

/// Equality that treats `1` and `1.0` as the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Orders two values of the same kind. Values of different kinds do not
/// compare, which makes range operators skip them.
pub fn compare_same_kind(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order used for sorting: missing/null, numbers, strings, objects,
/// arrays, booleans.
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = kind_rank(a).cmp(&kind_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Some(a), Some(b)) => compare_same_kind(a, b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_equality_across_representations() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!(2)));
        assert!(values_equal(&json!({ "n": 2 }), &json!({ "n": 2.0 })));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let big = json!(9_007_199_254_740_992_u64);
        let next = json!(9_007_199_254_740_993_u64);

        assert!(!values_equal(&big, &next));
        assert!(values_equal(&next, &json!(9_007_199_254_740_993_i64)));
        assert_eq!(compare_same_kind(&big, &next), Some(Ordering::Less));
        assert_eq!(
            compare_same_kind(&json!(u64::MAX), &json!(u64::MAX - 1)),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_same_kind(&json!(-1), &json!(u64::MAX)), Some(Ordering::Less));
        assert_eq!(
            compare_same_kind(&json!(u64::MAX), &json!(i64::MIN)),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_for_sort(Some(&next), Some(&big)), Ordering::Greater);
    }

    #[test]
    fn test_compare_same_kind() {
        assert_eq!(compare_same_kind(&json!(1), &json!(2.5)), Some(Ordering::Less));
        assert_eq!(compare_same_kind(&json!("b"), &json!("a")), Some(Ordering::Greater));
        assert_eq!(compare_same_kind(&json!("1"), &json!(1)), None);
    }

    #[test]
    fn test_sort_order_by_kind() {
        assert_eq!(compare_for_sort(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(compare_for_sort(Some(&json!(10)), Some(&json!("a"))), Ordering::Less);
        assert_eq!(compare_for_sort(Some(&json!(true)), Some(&json!([]))), Ordering::Greater);
        assert_eq!(compare_for_sort(None, Some(&Value::Null)), Ordering::Equal);
    }
}
