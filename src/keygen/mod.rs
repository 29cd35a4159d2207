//! Key generators for INSERT statements that omit the key column.

use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;

pub mod snowflake;
pub mod uuid;

pub use self::snowflake::Snowflake;
pub use self::uuid::UuidGenerator;

use crate::sharding::{Props, Value};

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown key generator type \"{0}\"")]
    UnknownGenerator(String),

    #[error("clock moved backwards by {0}ms")]
    ClockMovedBack(i64),

    #[error("{0}")]
    Property(#[from] crate::sharding::Error),
}

/// Produces unique values for a key column.
///
/// Implementations must be safe to call from many threads at once.
pub trait KeyGenerator: Debug + Send + Sync {
    /// Generate the next key.
    fn generate(&self) -> Result<Value, Error>;
}

/// Create a built-in key generator from its type name.
pub fn new(kind: &str, props: &Props) -> Result<Arc<dyn KeyGenerator>, Error> {
    match kind.to_uppercase().as_str() {
        "SNOWFLAKE" => Ok(Arc::new(Snowflake::new(props)?)),
        "UUID" => Ok(Arc::new(UuidGenerator)),
        _ => Err(Error::UnknownGenerator(kind.to_string())),
    }
}
