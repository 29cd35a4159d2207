//! Random UUID keys.

use ::uuid::Uuid;

use super::{Error, KeyGenerator};
use crate::sharding::Value;

/// UUID v4 without dashes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl KeyGenerator for UuidGenerator {
    fn generate(&self) -> Result<Value, Error> {
        Ok(Value::String(Uuid::new_v4().simple().to_string()))
    }
}
