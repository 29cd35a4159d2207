//! Value used as input to sharding algorithms.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A value extracted from a query, a bound parameter,
/// a hint or a generated key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    String(String),
}

impl Value {
    /// Get the value as an integer, parsing text if needed.
    pub fn int(&self) -> Option<i64> {
        match self {
            Value::Integer(int) => Some(*int),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text representation used by algorithms working on digits or bytes.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Boolean(b) => Some(Cow::Owned(b.to_string())),
            Value::Integer(int) => Some(Cow::Owned(int.to_string())),
            Value::String(text) => Some(Cow::Borrowed(text.as_str())),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render as a SQL literal, e.g. `'O''Brien'` or `42`.
    pub fn sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".into(),
            Value::Boolean(true) => "TRUE".into(),
            Value::Boolean(false) => "FALSE".into(),
            Value::Integer(int) => int.to_string(),
            Value::String(text) => format!("'{}'", text.replace('\'', "''")),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => match (self.int(), other.int()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => Some(a.cmp(b)),
            },
            (Value::Integer(_), Value::String(_)) | (Value::String(_), Value::Integer(_)) => {
                match (self.int(), other.int()) {
                    (Some(a), Some(b)) => Some(a.cmp(&b)),
                    _ => None,
                }
            }
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(int) => write!(f, "{}", int),
            Value::String(text) => write!(f, "{}", text),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}
