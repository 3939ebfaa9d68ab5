//! Small helpers over `serde_json::Value` shared by the fetcher, commands and
//! the compare engine.

use std::cmp::Ordering;

use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde_json::{Number, Value as JsonValue};

/// Human-readable JSON type name.
pub fn type_name(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn to_decimal(n: &Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    n.as_f64().and_then(Decimal::from_f64)
}

/// Numeric comparison that treats `1` and `1.0` as the same number.
pub fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    match (to_decimal(a), to_decimal(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
    }
}

/// Structural equality with numeric comparison for numbers.
pub fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(a), JsonValue::Number(b)) => compare_numbers(a, b) == Ordering::Equal,
        (JsonValue::Array(a), JsonValue::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(a, b))
        }
        (JsonValue::Object(a), JsonValue::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| values_equal(value, other)))
        }
        _ => a == b,
    }
}

/// Canonical text of a value: numbers in normalized decimal form and object
/// keys sorted, so two values that are `values_equal` render identically.
pub fn canonical_text(v: &JsonValue) -> String {
    match v {
        JsonValue::Number(n) => match to_decimal(n) {
            Some(d) => d.normalize().to_string(),
            None => n.to_string(),
        },
        JsonValue::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_text).collect();
            format!("[{}]", items.join(","))
        }
        JsonValue::Object(map) => {
            let mut entries: Vec<(&String, &JsonValue)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let entries: Vec<String> = entries
                .into_iter()
                .map(|(key, value)| format!("{}:{}", JsonValue::String(key.clone()), canonical_text(value)))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
        other => other.to_string(),
    }
}

/// Ordering for filter comparisons; `None` when the types can't be ordered.
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(a), JsonValue::Number(b)) => Some(compare_numbers(a, b)),
        (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
        (JsonValue::Bool(a), JsonValue::Bool(b)) => Some(a.cmp(b)),
        (JsonValue::Null, JsonValue::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Text form used when a value is concatenated or used as a name.
pub fn as_text(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[test]
fn test_numbers_compare_by_value() {
    assert!(values_equal(&serde_json::json!(1), &serde_json::json!(1.0)));
    assert!(values_equal(&serde_json::json!({"a": [1, 2.50]}), &serde_json::json!({"a": [1.0, 2.5]})));
    assert!(!values_equal(&serde_json::json!("1"), &serde_json::json!(1)));
}

#[test]
fn test_canonical_text_matches_numeric_equality() {
    use serde_json::json;
    assert_eq!(canonical_text(&json!(1)), canonical_text(&json!(1.0)));
    assert_eq!(canonical_text(&json!(2.50)), "2.5");
    assert_eq!(canonical_text(&json!({"b": 1, "a": [3.0]})), canonical_text(&json!({"a": [3], "b": 1.0})));
    assert_ne!(canonical_text(&json!("1")), canonical_text(&json!(1)));
}
