//! Component values and their loose truthiness.
//!
//! A component value is any [`Value`]: a primitive or an arbitrary object
//! tree. Presence tests throughout the engine use *truthiness* rather than
//! mere existence, so an entity with `{"visible": false}` does not "have"
//! `visible`.

use serde_json::{Map, Value};

use crate::error::{ComponentError, json_kind};

/// A set of components keyed by name, as passed to entity creation and
/// returned from snapshots.
pub type Components = Map<String, Value>;

/// Build a [`Components`] map from a JSON object.
///
/// # Errors
///
/// Returns [`ComponentError::InvalidComponents`] if `value` is not an object.
pub fn components_from_json(value: Value) -> Result<Components, ComponentError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ComponentError::InvalidComponents(json_kind(&other))),
    }
}

/// Loose truthiness of a component value.
///
/// `null`, `false`, numeric zero and the empty string are falsy. Everything
/// else is truthy, including empty arrays and empty objects.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

impl Truthy for Option<&Value> {
    fn is_truthy(&self) -> bool {
        self.is_some_and(|v| v.is_truthy())
    }
}

/// Value equality used by literal filters.
///
/// Numbers compare by numeric value, so `1` equals `1.0`; everything else
/// compares structurally.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_falsy_values() {
        for v in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!v.is_truthy(), "{v} should be falsy");
        }
    }

    #[test]
    fn test_truthy_values() {
        for v in [json!(true), json!(-1), json!("no"), json!([]), json!({})] {
            assert!(v.is_truthy(), "{v} should be truthy");
        }
    }

    #[test]
    fn test_missing_value_is_falsy() {
        let missing: Option<&Value> = None;
        assert!(!missing.is_truthy());
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!({"hp": 3}), &json!({"hp": 3.0})));
        assert!(!values_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn test_components_from_json_rejects_non_objects() {
        assert!(components_from_json(json!({"a": 1})).is_ok());
        assert_eq!(
            components_from_json(json!([1, 2])),
            Err(ComponentError::InvalidComponents("array"))
        );
    }
}
