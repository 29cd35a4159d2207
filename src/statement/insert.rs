//! INSERT specifics.

use serde::{Deserialize, Serialize};

use super::Expr;

/// Value in a VALUES row and where it is in the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSegment {
    pub start: usize,
    pub stop: usize,
    pub expr: Expr,
}

/// `(a, b, c)` in a VALUES list. The span includes the parentheses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertRow {
    pub start: usize,
    pub stop: usize,
    pub values: Vec<ValueSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InsertContext {
    /// Logical table.
    pub table: String,
    /// Column list, in order.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Position of the last character of the last column name.
    #[serde(default)]
    pub columns_stop: Option<usize>,
    #[serde(default)]
    pub rows: Vec<InsertRow>,
}

impl InsertContext {
    /// Position of a column in the column list.
    pub fn column_position(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }
}
