//! Rewrite errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("table \"{table}\" is not routed to data source \"{data_source}\"")]
    MissingTable { table: String, data_source: String },

    #[error("rewrite tokens overlap at position {0}")]
    Overlap(usize),

    #[error("rewrite token ends at {position}, past the end of the statement ({length})")]
    OutOfBounds { position: usize, length: usize },

    #[error("no rows of \"{table}\" are routed to data source \"{data_source}\"")]
    NoInsertRows { table: String, data_source: String },

    #[error("can't add generated key \"{0}\" without a column list")]
    MissingColumnsStop(String),

    #[error("{0}")]
    Pagination(#[from] crate::pagination::Error),
}
