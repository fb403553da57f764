//! Declared parameters of a definition.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The declared type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Boolean,
    Integer,
    Decimal,
    Text,
    /// ISO-8601 calendar date (`YYYY-MM-DD`).
    Date,
    /// Array of subject ids.
    SubjectList,
    Any,
}

impl ParameterType {
    /// Whether `value` is acceptable for this type. `null` is always accepted.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (ParameterType::Any, _) => true,
            (ParameterType::Boolean, Value::Bool(_)) => true,
            (ParameterType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (ParameterType::Decimal, Value::Number(_)) => true,
            (ParameterType::Text, Value::String(_)) => true,
            (ParameterType::Date, Value::String(s)) => {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
            }
            (ParameterType::SubjectList, Value::Array(items)) => items.iter().all(Value::is_u64),
            _ => false,
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::Boolean => write!(f, "boolean"),
            ParameterType::Integer => write!(f, "integer"),
            ParameterType::Decimal => write!(f, "decimal"),
            ParameterType::Text => write!(f, "text"),
            ParameterType::Date => write!(f, "date"),
            ParameterType::SubjectList => write!(f, "subject_list"),
            ParameterType::Any => write!(f, "any"),
        }
    }
}

/// Short name of a JSON value's kind, used in binding errors.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "decimal",
        Value::Number(_) => "integer",
        Value::String(_) => "text",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A named, typed parameter declared by a definition.
///
/// The name must match a configuration field of the declaring definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_accepted_by_every_type() {
        for ty in [
            ParameterType::Boolean,
            ParameterType::Integer,
            ParameterType::Decimal,
            ParameterType::Text,
            ParameterType::Date,
            ParameterType::SubjectList,
        ] {
            assert!(ty.accepts(&Value::Null), "{ty} should accept null");
        }
    }

    #[test]
    fn test_integer_rejects_fraction_and_text() {
        assert!(ParameterType::Integer.accepts(&json!(18)));
        assert!(!ParameterType::Integer.accepts(&json!(18.5)));
        assert!(!ParameterType::Integer.accepts(&json!("18")));
    }

    #[test]
    fn test_date_requires_iso_format() {
        assert!(ParameterType::Date.accepts(&json!("2024-02-29")));
        assert!(!ParameterType::Date.accepts(&json!("29/02/2024")));
        assert!(!ParameterType::Date.accepts(&json!("2023-02-29")));
    }

    #[test]
    fn test_subject_list_requires_unsigned_ids() {
        assert!(ParameterType::SubjectList.accepts(&json!([1, 2, 3])));
        assert!(!ParameterType::SubjectList.accepts(&json!([1, -2])));
        assert!(!ParameterType::SubjectList.accepts(&json!("1,2")));
    }

    #[test]
    fn test_parameter_serde_uses_type_key() {
        let p = Parameter::new("min_age", ParameterType::Integer).with_default(json!(18));
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["type"], "integer");
        assert_eq!(v["default_value"], 18);
    }
}
