//! Rewrite tokens and how each one renders for a route unit.

use super::Error;
use crate::route::RouteUnit;
use crate::rule::DataNode;
use crate::statement::{OrderBy, QuoteCharacter};

/// Replacement of a span of the original text.
///
/// `start` and `stop` are character positions, `stop` exclusive.
/// A token with `start == stop` inserts text without replacing any.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlToken {
    pub start: usize,
    pub stop: usize,
    pub kind: TokenKind,
}

impl SqlToken {
    /// Replace characters `start..=stop`.
    pub fn substitute(start: usize, stop: usize, kind: TokenKind) -> Self {
        Self {
            start,
            stop: stop + 1,
            kind,
        }
    }

    /// Insert text before the character at `position`.
    pub fn attach(position: usize, kind: TokenKind) -> Self {
        Self {
            start: position,
            stop: position,
            kind,
        }
    }
}

/// One row of a rewritten VALUES list.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertValuesRow {
    /// Text of each value, parameter markers as written.
    pub values: Vec<String>,
    /// Data nodes the row is routed to. Empty means every node.
    pub data_nodes: Vec<DataNode>,
    /// `?` parameters the row consumes.
    pub parameters: Vec<usize>,
}

impl InsertValuesRow {
    fn routed_to(&self, node: &DataNode) -> bool {
        self.data_nodes.is_empty() || self.data_nodes.contains(node)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Logical table name.
    Table {
        logic_table: String,
        quote: QuoteCharacter,
    },
    /// Column qualifier, dot included.
    Owner {
        owner: String,
        logic_table: Option<String>,
        quote: QuoteCharacter,
    },
    /// Index name, made unique per actual table.
    Index {
        name: String,
        logic_table: String,
        quote: QuoteCharacter,
    },
    /// Constraint name, made unique per actual table.
    Constraint {
        name: String,
        logic_table: String,
        quote: QuoteCharacter,
    },
    /// Select list item the merger needs but the query doesn't return.
    Projection {
        owner: Option<String>,
        logic_table: Option<String>,
        column: String,
        alias: String,
    },
    OrderBy(Vec<OrderBy>),
    Offset(i64),
    RowCount(i64),
    InsertValues {
        logic_table: String,
        rows: Vec<InsertValuesRow>,
    },
    /// Column added to the INSERT column list.
    InsertColumn(String),
    Literal(String),
    /// Several items rendered as one comma separated list.
    Composite {
        children: Vec<TokenKind>,
        /// Items follow an existing list and need a leading comma.
        continues_list: bool,
    },
}

impl TokenKind {
    /// Text for this token in a route unit.
    pub fn render(&self, unit: &RouteUnit) -> Result<String, Error> {
        Ok(match self {
            Self::Table { logic_table, quote } => quote.wrap(actual_table(unit, logic_table)?),

            Self::Owner {
                owner,
                logic_table,
                quote,
            } => {
                if owner.is_empty() {
                    String::new()
                } else {
                    match logic_table {
                        Some(table) => format!("{}.", quote.wrap(actual_table(unit, table)?)),
                        None => format!("{}.", quote.wrap(owner)),
                    }
                }
            }

            Self::Index {
                name,
                logic_table,
                quote,
            }
            | Self::Constraint {
                name,
                logic_table,
                quote,
            } => quote.wrap(&format!("{}_{}", name, actual_table(unit, logic_table)?)),

            Self::Projection {
                owner,
                logic_table,
                column,
                alias,
            } => {
                let owner = match (logic_table, owner) {
                    (Some(table), _) => Some(actual_table(unit, table)?.to_string()),
                    (None, Some(owner)) => Some(owner.clone()),
                    (None, None) => None,
                };
                match owner {
                    Some(owner) => format!("{}.{} AS {}", owner, column, alias),
                    None => format!("{} AS {}", column, alias),
                }
            }

            Self::OrderBy(items) => format!(
                " ORDER BY {} ",
                items
                    .iter()
                    .map(|item| item.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),

            Self::Offset(value) | Self::RowCount(value) => value.to_string(),

            Self::InsertValues { logic_table, rows } => {
                let node = unit.data_node(logic_table).ok_or_else(|| Error::MissingTable {
                    table: logic_table.clone(),
                    data_source: unit.data_source().to_string(),
                })?;

                let rows = rows
                    .iter()
                    .filter(|row| row.routed_to(&node))
                    .map(|row| format!("({})", row.values.join(", ")))
                    .collect::<Vec<_>>();

                if rows.is_empty() {
                    return Err(Error::NoInsertRows {
                        table: logic_table.clone(),
                        data_source: unit.data_source().to_string(),
                    });
                }

                rows.join(", ")
            }

            Self::InsertColumn(column) => format!(", {}", column),

            Self::Literal(text) => text.clone(),

            Self::Composite {
                children,
                continues_list,
            } => {
                let items = children
                    .iter()
                    .map(|child| child.render(unit))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ");
                if *continues_list && !items.is_empty() {
                    format!(", {}", items)
                } else {
                    items
                }
            }
        })
    }

    /// Parameters of INSERT rows this unit doesn't receive.
    pub fn excluded_parameters(&self, unit: &RouteUnit) -> Vec<usize> {
        let Self::InsertValues { logic_table, rows } = self else {
            return vec![];
        };
        let Some(node) = unit.data_node(logic_table) else {
            return vec![];
        };

        rows.iter()
            .filter(|row| !row.routed_to(&node))
            .flat_map(|row| row.parameters.iter().copied())
            .collect()
    }
}

fn actual_table<'a>(unit: &'a RouteUnit, logic_table: &str) -> Result<&'a str, Error> {
    unit.actual_table(logic_table)
        .ok_or_else(|| Error::MissingTable {
            table: logic_table.to_string(),
            data_source: unit.data_source().to_string(),
        })
}
