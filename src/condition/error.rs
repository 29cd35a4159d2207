//! Condition extraction errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("subquery and outer query sharding conditions differ")]
    SubqueryConditionMismatch,

    #[error("insert row {row}: {source}")]
    Value {
        row: usize,
        source: crate::statement::expr::Error,
    },

    #[error("{0}")]
    Expr(#[from] crate::statement::expr::Error),

    #[error("{0}")]
    KeyGenerator(#[from] crate::keygen::Error),
}
