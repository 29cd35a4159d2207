//! Per-axis sharding strategy.

use std::sync::Arc;

use crate::sharding::Algorithm;

/// Which side of a data node is being routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Database,
    Table,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => write!(f, "database"),
            Self::Table => write!(f, "table"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum ShardingStrategy {
    /// Sharding values come from predicates on a column.
    Standard {
        column: String,
        algorithm: Arc<Algorithm>,
    },
    /// Sharding values come from a hint.
    Hint { algorithm: Arc<Algorithm> },
    /// Every target on this axis.
    #[default]
    None,
}

impl ShardingStrategy {
    /// Sharding column, if the strategy reads one.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Standard { column, .. } => Some(column.as_str()),
            _ => None,
        }
    }

    pub fn algorithm(&self) -> Option<&Algorithm> {
        match self {
            Self::Standard { algorithm, .. } | Self::Hint { algorithm } => Some(algorithm),
            Self::None => None,
        }
    }
}
