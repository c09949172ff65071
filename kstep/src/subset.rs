/*!

Partial structural comparison of an expected document against a live one. The expected document
only has to describe the parts of the live object that matter: every key it contains must be
present in the live object with an equal value, and everything else in the live object is ignored.

!*/

use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Describes where and how an expected document differs from a live one.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SubsetError {
    /// Path segments from the innermost value outward. Reversed when displayed.
    path: Vec<String>,
    message: String,
}

impl SubsetError {
    fn new<S: Into<String>>(message: S) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    fn within<S: Into<String>>(mut self, segment: S) -> Self {
        self.path.push(segment.into());
        self
    }

    /// The dotted path of the offending value, e.g. `spec.containers.[0].image`.
    pub fn path(&self) -> String {
        self.path
            .iter()
            .rev()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for SubsetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path(), self.message)
        }
    }
}

impl std::error::Error for SubsetError {}

/// Returns `Ok(())` if `expected` is a subset of `actual`:
/// - mappings: every key of `expected` is in `actual` and its value is a subset of `actual`'s.
/// - sequences: both have the same length and each element is a subset of its counterpart.
/// - scalars: equal. Numbers are equal if their numeric values are.
pub fn is_subset(expected: &Value, actual: &Value) -> Result<(), SubsetError> {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => is_map_subset(expected, actual),
        (Value::Array(expected), Value::Array(actual)) => {
            if expected.len() != actual.len() {
                return Err(SubsetError::new(format!(
                    "slice length mismatch: {} != {}",
                    expected.len(),
                    actual.len()
                )));
            }
            for (i, (expected, actual)) in expected.iter().zip(actual).enumerate() {
                is_subset(expected, actual).map_err(|e| e.within(format!("[{}]", i)))?;
            }
            Ok(())
        }
        (Value::Number(e), Value::Number(a)) if e == a || e.as_f64() == a.as_f64() => Ok(()),
        (expected, actual) if type_name(expected) != type_name(actual) => {
            Err(SubsetError::new(format!(
                "type mismatch: {} != {}",
                type_name(expected),
                type_name(actual)
            )))
        }
        (expected, actual) if expected == actual => Ok(()),
        (expected, actual) => Err(SubsetError::new(format!(
            "value mismatch, expected: {} != actual: {}",
            expected, actual
        ))),
    }
}

fn is_map_subset(expected: &Map<String, Value>, actual: &Map<String, Value>) -> Result<(), SubsetError> {
    for (key, expected_value) in expected {
        let actual_value = actual
            .get(key)
            .ok_or_else(|| SubsetError::new("key is missing from map").within(key))?;
        is_subset(expected_value, actual_value).map_err(|e| e.within(key))?;
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Reduces `actual` to the shape of `expected`: mappings keep only the keys `expected` has and
/// sequences are pruned element by element. Used to render a readable diff of large live objects.
pub fn prune(actual: &Value, expected: &Value) -> Value {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => Value::Object(
            actual
                .iter()
                .filter_map(|(key, value)| {
                    expected
                        .get(key)
                        .map(|expected| (key.clone(), prune(value, expected)))
                })
                .collect(),
        ),
        (Value::Array(actual), Value::Array(expected)) => Value::Array(
            actual
                .iter()
                .enumerate()
                .map(|(i, value)| match expected.get(i) {
                    Some(expected) => prune(value, expected),
                    None => value.clone(),
                })
                .collect(),
        ),
        (actual, _) => actual.clone(),
    }
}
