//! Routing errors.

use thiserror::Error;

use crate::rule::Axis;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no {axis} matches the sharding values of \"{table}\"")]
    NoTargets { table: String, axis: Axis },

    #[error("\"{0}\" routed to no data nodes")]
    NoDataNodes(String),

    #[error("tables {0:?} share no data source")]
    NoCommonDataSource(Vec<String>),

    #[error("insert row {row} into \"{table}\" routes to {nodes} data nodes")]
    InsertMultipleNodes {
        table: String,
        row: usize,
        nodes: usize,
    },

    #[error("hinted data source \"{0}\" is not part of the route")]
    HintDataSource(String),

    #[error("{0}")]
    Sharding(#[from] crate::sharding::Error),
}
