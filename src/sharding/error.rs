//! Sharding algorithm errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("unknown sharding algorithm type \"{0}\"")]
    UnknownAlgorithm(String),

    #[error("missing required property \"{0}\"")]
    MissingProperty(String),

    #[error("property \"{0}\" must be positive")]
    NonPositive(String),

    #[error("property \"{key}\" has invalid value \"{value}\"")]
    InvalidProperty { key: String, value: String },

    #[error("sharding value \"{0}\" is not an integer")]
    NotAnInteger(String),

    #[error("sharding value is null")]
    NullValue,

    #[error("offsets [{start}, {stop}] exceed the length of \"{value}\"")]
    OffsetOutOfBounds {
        value: String,
        start: usize,
        stop: usize,
    },

    #[error("\"{value}\" doesn't match datetime pattern \"{pattern}\"")]
    InvalidDatetime { value: String, pattern: String },
}
