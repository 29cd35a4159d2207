//! WHERE clause predicates on columns.

use serde::{Deserialize, Serialize};

use super::Expr;

/// Column, optionally qualified by a table name or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    #[serde(default)]
    pub owner: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: &str) -> Self {
        Self {
            owner: None,
            name: name.to_string(),
        }
    }

    pub fn qualified(owner: &str, name: &str) -> Self {
        Self {
            owner: Some(owner.to_string()),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `column = value`
    Equal(Expr),
    /// `column IN (a, b, c)`
    In(Vec<Expr>),
    /// `column BETWEEN low AND high`
    Between { low: Expr, high: Expr },
    GreaterThan(Expr),
    GreaterThanOrEqual(Expr),
    LessThan(Expr),
    LessThanOrEqual(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: ColumnRef,
    pub operator: Operator,
}

impl Predicate {
    pub fn equal(column: ColumnRef, value: Expr) -> Self {
        Self {
            column,
            operator: Operator::Equal(value),
        }
    }

    pub fn in_list(column: ColumnRef, values: Vec<Expr>) -> Self {
        Self {
            column,
            operator: Operator::In(values),
        }
    }

    pub fn between(column: ColumnRef, low: Expr, high: Expr) -> Self {
        Self {
            column,
            operator: Operator::Between { low, high },
        }
    }
}

/// Predicates joined by AND. A WHERE clause is a list of these joined by OR.
pub type AndPredicate = Vec<Predicate>;
