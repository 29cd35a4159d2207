//! Rule construction errors.
//!
//! Rules are checked when loaded; anything wrong fails the load.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no data sources configured")]
    NoDataSources,

    #[error("data source \"{0}\" is declared more than once")]
    DuplicateDataSource(String),

    #[error("default data source \"{0}\" is not declared")]
    UnknownDefaultDataSource(String),

    #[error("\"{0}\" is not a valid data node, expected \"data_source.table\"")]
    InvalidDataNode(String),

    #[error("table \"{table}\" uses undeclared data source \"{data_source}\"")]
    UnknownDataSource { table: String, data_source: String },

    #[error("table \"{0}\" has no data nodes")]
    NoDataNodes(String),

    #[error("table \"{0}\" is configured more than once")]
    DuplicateTable(String),

    #[error("table \"{table}\" uses undefined algorithm \"{algorithm}\"")]
    UnknownAlgorithm { table: String, algorithm: String },

    #[error("table \"{table}\" uses undefined key generator \"{generator}\"")]
    UnknownKeyGenerator { table: String, generator: String },

    #[error("algorithm \"{name}\": {source}")]
    Algorithm {
        name: String,
        source: crate::sharding::Error,
    },

    #[error("key generator \"{name}\": {source}")]
    KeyGenerator {
        name: String,
        source: crate::keygen::Error,
    },

    #[error("\"{0}\" is both a broadcast and a sharding table")]
    BroadcastAndSharded(String),

    #[error("binding table \"{0}\" is not a sharding table")]
    UnknownBindingTable(String),

    #[error("table \"{0}\" belongs to more than one binding group")]
    DuplicateBinding(String),

    #[error("binding tables \"{primary}\" and \"{table}\" have different data nodes layout")]
    BindingLayout { primary: String, table: String },

    #[error("table \"{table}\": {source}")]
    Inline {
        table: String,
        source: crate::config::inline::Error,
    },
}
