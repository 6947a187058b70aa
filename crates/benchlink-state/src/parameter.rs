// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed parameter values and constraints
//!
//! Parameter values are a closed set of variants rather than free-form JSON;
//! the variant is fixed at registration time and every write is checked
//! against it.

use serde::Serialize;
use serde_json::Value;

/// A parameter value
///
/// Serializes untagged, as the native JSON scalar/array the UI expects.
/// Decoding from JSON is not derived: an incoming number is resolved against
/// the registered [`ParameterKind`] via [`ParameterValue::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
}

/// Type tag of a parameter, fixed at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ParameterKind {
    Bool = 0,
    Int = 1,
    Float = 2,
    Str = 3,
    IntArray = 4,
    FloatArray = 5,
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParameterKind::Bool => "bool",
            ParameterKind::Int => "int",
            ParameterKind::Float => "float",
            ParameterKind::Str => "str",
            ParameterKind::IntArray => "int[]",
            ParameterKind::FloatArray => "float[]",
        };
        write!(f, "{}", name)
    }
}

impl ParameterValue {
    /// Type tag of this value
    pub fn kind(&self) -> ParameterKind {
        match self {
            ParameterValue::Bool(_) => ParameterKind::Bool,
            ParameterValue::Int(_) => ParameterKind::Int,
            ParameterValue::Float(_) => ParameterKind::Float,
            ParameterValue::Str(_) => ParameterKind::Str,
            ParameterValue::IntArray(_) => ParameterKind::IntArray,
            ParameterValue::FloatArray(_) => ParameterKind::FloatArray,
        }
    }

    /// Decode a JSON value against a registered kind
    ///
    /// JSON does not distinguish `1` from `1.0`, so integral numbers widen to
    /// `Float` when the registered kind asks for it. The reverse narrowing
    /// (`1.5` into an `Int` parameter) is rejected.
    pub fn from_json(value: &Value, kind: ParameterKind) -> Option<ParameterValue> {
        match kind {
            ParameterKind::Bool => value.as_bool().map(ParameterValue::Bool),
            ParameterKind::Int => value.as_i64().map(ParameterValue::Int),
            ParameterKind::Float => value.as_f64().map(ParameterValue::Float),
            ParameterKind::Str => value.as_str().map(|s| ParameterValue::Str(s.to_string())),
            ParameterKind::IntArray => {
                let items = value.as_array()?;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.as_i64()?);
                }
                Some(ParameterValue::IntArray(out))
            }
            ParameterKind::FloatArray => {
                let items = value.as_array()?;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.as_f64()?);
                }
                Some(ParameterValue::FloatArray(out))
            }
        }
    }

    /// Encode as a JSON value
    pub fn to_json(&self) -> Value {
        match self {
            ParameterValue::Bool(v) => Value::from(*v),
            ParameterValue::Int(v) => Value::from(*v),
            ParameterValue::Float(v) => Value::from(*v),
            ParameterValue::Str(v) => Value::from(v.clone()),
            ParameterValue::IntArray(v) => Value::from(v.clone()),
            ParameterValue::FloatArray(v) => Value::from(v.clone()),
        }
    }
}

/// Optional constraint metadata attached at registration
#[derive(Debug, Clone)]
pub enum Constraint {
    /// No constraint
    None,
    /// Inclusive numeric range; applies to Int/Float values and each element
    /// of numeric arrays
    Range { min: f64, max: f64 },
    /// Value must equal one of the listed values
    Enum(Vec<ParameterValue>),
}

impl Constraint {
    /// Check a value against this constraint
    ///
    /// Returns a human-readable reason on failure, used in error reporting
    /// back to the peer.
    pub fn check(&self, value: &ParameterValue) -> Result<(), String> {
        match self {
            Constraint::None => Ok(()),
            Constraint::Range { min, max } => {
                let in_range = |v: f64| v >= *min && v <= *max;
                let ok = match value {
                    ParameterValue::Int(v) => in_range(*v as f64),
                    ParameterValue::Float(v) => in_range(*v),
                    ParameterValue::IntArray(vs) => vs.iter().all(|v| in_range(*v as f64)),
                    ParameterValue::FloatArray(vs) => vs.iter().all(|v| in_range(*v)),
                    // Range on non-numeric kinds never passes
                    _ => false,
                };
                if ok {
                    Ok(())
                } else {
                    Err(format!("outside range [{}, {}]", min, max))
                }
            }
            Constraint::Enum(allowed) => {
                if allowed.contains(value) {
                    Ok(())
                } else {
                    Err("not in enumerated value set".to_string())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_tags() {
        assert_eq!(ParameterValue::Bool(true).kind(), ParameterKind::Bool);
        assert_eq!(ParameterValue::Float(0.5).kind(), ParameterKind::Float);
        assert_eq!(
            ParameterValue::IntArray(vec![1, 2]).kind(),
            ParameterKind::IntArray
        );
    }

    #[test]
    fn test_from_json_widens_int_to_float() {
        let v = ParameterValue::from_json(&json!(1), ParameterKind::Float).unwrap();
        assert_eq!(v, ParameterValue::Float(1.0));
    }

    #[test]
    fn test_from_json_rejects_float_narrowing() {
        assert!(ParameterValue::from_json(&json!(1.5), ParameterKind::Int).is_none());
    }

    #[test]
    fn test_from_json_arrays() {
        let v = ParameterValue::from_json(&json!([1, 2, 3]), ParameterKind::IntArray).unwrap();
        assert_eq!(v, ParameterValue::IntArray(vec![1, 2, 3]));

        let v = ParameterValue::from_json(&json!([0.5, 1]), ParameterKind::FloatArray).unwrap();
        assert_eq!(v, ParameterValue::FloatArray(vec![0.5, 1.0]));

        assert!(ParameterValue::from_json(&json!([1, "x"]), ParameterKind::IntArray).is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let original = ParameterValue::Float(0.25);
        let encoded = original.to_json();
        let decoded = ParameterValue::from_json(&encoded, ParameterKind::Float).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_untagged_serialization() {
        let v = ParameterValue::Str("pos".to_string());
        assert_eq!(serde_json::to_string(&v).unwrap(), r#""pos""#);

        let v = ParameterValue::IntArray(vec![1, 8, 64]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[1,8,64]");
    }

    #[test]
    fn test_range_constraint() {
        let c = Constraint::Range { min: 0.0, max: 1.0 };
        assert!(c.check(&ParameterValue::Float(0.5)).is_ok());
        assert!(c.check(&ParameterValue::Float(1.0)).is_ok());
        assert!(c.check(&ParameterValue::Float(1.5)).is_err());
        assert!(c.check(&ParameterValue::Int(0)).is_ok());
        assert!(c.check(&ParameterValue::FloatArray(vec![0.1, 0.9])).is_ok());
        assert!(c.check(&ParameterValue::FloatArray(vec![0.1, 2.0])).is_err());
        assert!(c.check(&ParameterValue::Str("x".to_string())).is_err());
    }

    #[test]
    fn test_enum_constraint() {
        let c = Constraint::Enum(vec![
            ParameterValue::Str("pos".to_string()),
            ParameterValue::Str("neg".to_string()),
        ]);
        assert!(c.check(&ParameterValue::Str("pos".to_string())).is_ok());
        assert!(c.check(&ParameterValue::Str("both".to_string())).is_err());
    }
}
