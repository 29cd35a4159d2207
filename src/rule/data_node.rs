//! Physical location of one shard of a logical table.

use std::fmt::Display;
use std::str::FromStr;

use super::Error;

/// `data_source.table`, e.g. `ds_0.t_order_1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataNode {
    pub data_source: String,
    pub table: String,
}

impl DataNode {
    pub fn new(data_source: impl ToString, table: impl ToString) -> Self {
        Self {
            data_source: data_source.to_string(),
            table: table.to_string(),
        }
    }
}

impl FromStr for DataNode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('.') {
            Some((data_source, table)) if !data_source.is_empty() && !table.is_empty() => {
                Ok(Self::new(data_source, table))
            }
            _ => Err(Error::InvalidDataNode(s.to_string())),
        }
    }
}

impl Display for DataNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.data_source, self.table)
    }
}
