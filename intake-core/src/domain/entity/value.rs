// intake-core/src/domain/entity/value.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::field::FieldType;

/// A single attribute value inside an open attribute bag.
///
/// Records coming out of a parser carry no fixed schema, but every value keeps
/// its type so validation and scoring can reason about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    #[default]
    Null,
    String(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
    Json(serde_json::Value),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Null, or a string made only of whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used by range checks. Numeric strings are accepted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Decimal(d) => Some(*d),
            FieldValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::String(_) => "string",
            FieldValue::Integer(_) => "integer",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Date(_) => "date",
            FieldValue::Json(_) => "json",
        }
    }

    /// Whether the value can stand for the declared field type.
    ///
    /// Parsers frequently hand over raw text, so a string that parses to the
    /// declared type conforms as well. Integers conform to `decimal`.
    pub fn conforms_to(&self, field_type: FieldType) -> bool {
        match (field_type, self) {
            (_, FieldValue::Null) => true,
            (FieldType::String, FieldValue::String(_)) => true,
            (FieldType::Integer, FieldValue::Integer(_)) => true,
            (FieldType::Integer, FieldValue::String(s)) => s.trim().parse::<i64>().is_ok(),
            (FieldType::Decimal, FieldValue::Decimal(_) | FieldValue::Integer(_)) => true,
            (FieldType::Decimal, FieldValue::String(s)) => s.trim().parse::<f64>().is_ok(),
            (FieldType::Boolean, FieldValue::Boolean(_)) => true,
            (FieldType::Boolean, FieldValue::String(s)) => {
                matches!(s.trim().to_lowercase().as_str(), "true" | "false")
            }
            (FieldType::Date, FieldValue::Date(_)) => true,
            (FieldType::Date, FieldValue::String(s)) => {
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok()
            }
            (FieldType::Json, FieldValue::Json(_)) => true,
            (FieldType::Json, FieldValue::String(s)) => {
                serde_json::from_str::<serde_json::Value>(s).is_ok()
            }
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        FieldValue::Json(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}
