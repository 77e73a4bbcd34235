//! Typed field values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a field; selects the converter and the empty sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Char,
    Bool,
    Int,
    Long,
    Double,
    Date,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Char => "char",
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Long => "long",
            FieldKind::Double => "double",
            FieldKind::Date => "date",
        }
    }

    /// Value stored when a non-nullable field of this kind binds an empty
    /// token and has no default.
    pub fn zero(&self) -> Value {
        match self {
            FieldKind::Text => Value::Text(String::new()),
            FieldKind::Char => Value::Char('\0'),
            FieldKind::Bool => Value::Bool(false),
            FieldKind::Int => Value::Int(i32::MIN),
            FieldKind::Long => Value::Long(i64::MIN),
            FieldKind::Double => Value::Double(f64::MIN_POSITIVE),
            FieldKind::Date => Value::Null,
        }
    }

    /// Kinds whose bound value may drive another field's length.
    pub fn is_integral(&self) -> bool {
        matches!(self, FieldKind::Int | FieldKind::Long)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A converted field value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Char(char),
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Char(_) => "char",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Date(_) => "date",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integral view of `Int` and `Long` values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// True when the value is `Null` or the empty sentinel of `kind`.
    pub fn is_unset(&self, kind: FieldKind) -> bool {
        match self {
            Value::Null => true,
            Value::Text(_) | Value::Char(_) | Value::Bool(_) => false,
            other => *other == kind.zero(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}
