//! SELECT specifics: projections, grouping, sorting and pagination.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{ColumnRef, Expr};

/// Sorting column extracted from the query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    Asc(usize),
    Desc(usize),
    AscColumn(ColumnRef),
    DescColumn(ColumnRef),
}

impl OrderBy {
    /// ORDER BY x ASC
    pub fn asc(&self) -> bool {
        matches!(self, OrderBy::Asc(_) | OrderBy::AscColumn(_))
    }

    /// Column index, zero-based.
    pub fn index(&self) -> Option<usize> {
        match self {
            OrderBy::Asc(column) | OrderBy::Desc(column) => column.checked_sub(1),
            _ => None,
        }
    }

    /// Get column.
    pub fn column(&self) -> Option<&ColumnRef> {
        match self {
            OrderBy::AscColumn(ref column) | OrderBy::DescColumn(ref column) => Some(column),
            _ => None,
        }
    }
}

impl Display for OrderBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let direction = if self.asc() { "ASC" } else { "DESC" };
        match self {
            OrderBy::Asc(index) | OrderBy::Desc(index) => write!(f, "{} {}", index, direction),
            OrderBy::AscColumn(column) | OrderBy::DescColumn(column) => match column.owner {
                Some(ref owner) => write!(f, "{}.{} {}", owner, column.name, direction),
                None => write!(f, "{} {}", column.name, direction),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

/// Item in the select list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Column name or expression text.
    pub expression: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub aggregate: Option<AggregateFunction>,
}

impl Projection {
    pub fn column(name: &str) -> Self {
        Self {
            expression: name.to_string(),
            owner: None,
            alias: None,
            aggregate: None,
        }
    }

    /// Can an ORDER BY or GROUP BY column be read from this projection?
    pub fn provides(&self, column: &ColumnRef) -> bool {
        if let Some(ref alias) = self.alias {
            if alias.eq_ignore_ascii_case(&column.name) && column.owner.is_none() {
                return true;
            }
        }

        if !self.expression.eq_ignore_ascii_case(&column.name) {
            return false;
        }

        match (&self.owner, &column.owner) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBy {
    pub items: Vec<OrderBy>,
    /// Position of the last character of the GROUP BY clause.
    pub stop: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// `LIMIT offset, count` or `LIMIT count OFFSET offset`.
    #[default]
    Limit,
    /// `ROWNUM` predicates or `ROW_NUMBER()` windows.
    RowNumber,
    /// `TOP count`
    Top,
}

/// Offset or row count value and where it is in the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationValue {
    pub value: Expr,
    pub start: usize,
    pub stop: usize,
    /// Comparison excludes the bound, e.g. `ROWNUM > 10` or `ROWNUM < 20`.
    #[serde(default)]
    pub bound_opened: bool,
}

impl PaginationValue {
    pub fn new(start: usize, stop: usize, value: Expr) -> Self {
        Self {
            value,
            start,
            stop,
            bound_opened: false,
        }
    }

    pub fn opened(mut self) -> Self {
        self.bound_opened = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Pagination {
    #[serde(default)]
    pub offset: Option<PaginationValue>,
    #[serde(default)]
    pub row_count: Option<PaginationValue>,
    #[serde(default)]
    pub style: PaginationStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SelectContext {
    #[serde(default)]
    pub projections: Vec<Projection>,
    /// Position of the last character of the select list.
    #[serde(default)]
    pub projections_stop: Option<usize>,
    /// `SELECT *`
    #[serde(default)]
    pub shorthand: bool,
    #[serde(default)]
    pub group_by: Option<GroupBy>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl SelectContext {
    pub fn has_aggregates(&self) -> bool {
        self.projections.iter().any(|p| p.aggregate.is_some())
    }

    pub fn group_by_items(&self) -> &[OrderBy] {
        self.group_by
            .as_ref()
            .map(|group_by| group_by.items.as_slice())
            .unwrap_or(&[])
    }

    /// GROUP BY and ORDER BY sort the same way, so rows merge in one pass.
    /// Without ORDER BY, grouped rows get sorted by the GROUP BY columns.
    pub fn is_same_group_by_and_order_by(&self) -> bool {
        let group_by = self.group_by_items();
        if group_by.is_empty() {
            return false;
        }
        self.order_by.is_empty() || group_by == self.order_by.as_slice()
    }
}
