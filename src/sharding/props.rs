//! Algorithm and key generator properties.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Error;

/// Property value, as written in the rules file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl PropValue {
    fn text(&self) -> String {
        match self {
            Self::Integer(int) => int.to_string(),
            Self::Float(float) => float.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::String(s) => s.clone(),
        }
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Named properties, e.g. `sharding-count = 4`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Props {
    values: BTreeMap<String, PropValue>,
}

impl Props {
    /// Add a property.
    pub fn with(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Get a property as text, if set.
    pub fn str(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|value| value.text())
    }

    pub fn required_str(&self, key: &str) -> Result<String, Error> {
        self.str(key)
            .ok_or_else(|| Error::MissingProperty(key.to_string()))
    }

    /// Get an integer property, if set.
    pub fn int(&self, key: &str) -> Result<Option<i64>, Error> {
        match self.values.get(key) {
            None => Ok(None),
            Some(PropValue::Integer(int)) => Ok(Some(*int)),
            Some(value) => {
                let text = value.text();
                text.trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| Error::InvalidProperty {
                        key: key.to_string(),
                        value: text,
                    })
            }
        }
    }

    pub fn int_or(&self, key: &str, default: i64) -> Result<i64, Error> {
        Ok(self.int(key)?.unwrap_or(default))
    }

    /// Required integer property that must be greater than zero.
    pub fn positive(&self, key: &str) -> Result<usize, Error> {
        let value = self
            .int(key)?
            .ok_or_else(|| Error::MissingProperty(key.to_string()))?;
        if value <= 0 {
            return Err(Error::NonPositive(key.to_string()));
        }
        Ok(value as usize)
    }

    /// Optional integer property that can't be negative.
    pub fn unsigned_or(&self, key: &str, default: usize) -> Result<usize, Error> {
        match self.int(key)? {
            None => Ok(default),
            Some(value) if value >= 0 => Ok(value as usize),
            Some(value) => Err(Error::InvalidProperty {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, Error> {
        match self.values.get(key) {
            None => Ok(default),
            Some(PropValue::Boolean(b)) => Ok(*b),
            Some(value) => match value.text().to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(Error::InvalidProperty {
                    key: key.to_string(),
                    value: other.to_string(),
                }),
            },
        }
    }
}
