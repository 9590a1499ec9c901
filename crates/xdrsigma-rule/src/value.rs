//! Scalar values appearing in detection items.

use std::fmt;

use serde::Serialize;

/// A scalar value attached to a detection field.
///
/// `Null` doubles as the Sigma "exists" sentinel: `Field: null` means the
/// field must be absent (or, combined with `|exists`, a presence test).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SigmaValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl SigmaValue {
    /// Convert a YAML scalar into a `SigmaValue`.
    ///
    /// Non-scalar YAML (mappings, sequences) maps to `Null`; the detection
    /// parser rejects those shapes before this is reached.
    pub fn from_yaml(value: &serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::String(s) => SigmaValue::String(s.clone()),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SigmaValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    SigmaValue::Float(f)
                } else {
                    SigmaValue::Null
                }
            }
            serde_yaml::Value::Bool(b) => SigmaValue::Bool(*b),
            _ => SigmaValue::Null,
        }
    }

    /// Borrow the string content, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SigmaValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SigmaValue::Null)
    }
}

impl fmt::Display for SigmaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigmaValue::String(s) => write!(f, "{s}"),
            SigmaValue::Integer(i) => write!(f, "{i}"),
            SigmaValue::Float(x) => write!(f, "{x}"),
            SigmaValue::Bool(b) => write!(f, "{b}"),
            SigmaValue::Null => write!(f, "null"),
        }
    }
}
