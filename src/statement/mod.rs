//! Statement context produced by the SQL parser and binder.
//!
//! Everything routing and rewriting need to know about a statement:
//! the tables it touches, its predicates, and where each rewritable
//! name is in the original text.

pub mod expr;
pub mod insert;
pub mod predicate;
pub mod segment;
pub mod select;

pub use expr::{Expr, MarkerKind, ParameterMarker};
pub use insert::{InsertContext, InsertRow, ValueSegment};
pub use predicate::{AndPredicate, ColumnRef, Operator, Predicate};
pub use segment::{
    ColumnSegment, ConstraintSegment, IdentifierSegment, IndexSegment, OwnerSegment,
    QuoteCharacter, TableSegment,
};
pub use select::{
    AggregateFunction, GroupBy, OrderBy, Pagination, PaginationStyle, PaginationValue,
    Projection, SelectContext,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StatementContext {
    pub sql: String,
    #[serde(default)]
    pub kind: StatementKind,
    /// Tables in the order they appear.
    #[serde(default)]
    pub tables: Vec<TableSegment>,
    /// Qualified column references.
    #[serde(default)]
    pub columns: Vec<ColumnSegment>,
    /// WHERE clause as OR of ANDs.
    #[serde(default)]
    pub conditions: Vec<AndPredicate>,
    #[serde(default)]
    pub select: Option<SelectContext>,
    #[serde(default)]
    pub insert: Option<InsertContext>,
    #[serde(default)]
    pub indexes: Vec<IndexSegment>,
    #[serde(default)]
    pub constraints: Vec<ConstraintSegment>,
    /// Nested SELECTs. Their segments point into the same text.
    #[serde(default)]
    pub subqueries: Vec<StatementContext>,
}

impl StatementContext {
    pub fn new(sql: &str, kind: StatementKind) -> Self {
        Self {
            sql: sql.to_string(),
            kind,
            ..Default::default()
        }
    }

    pub fn table(mut self, table: TableSegment) -> Self {
        self.tables.push(table);
        self
    }

    pub fn column(mut self, column: ColumnSegment) -> Self {
        self.columns.push(column);
        self
    }

    pub fn condition(mut self, condition: AndPredicate) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Table segments here and in subqueries.
    pub fn all_tables(&self) -> Vec<&TableSegment> {
        let mut tables = self.tables.iter().collect::<Vec<_>>();
        for subquery in &self.subqueries {
            tables.extend(subquery.all_tables());
        }
        tables
    }

    /// Distinct logical table names, in order of appearance.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = vec![];
        let insert = self.insert.as_ref().map(|insert| insert.table.to_lowercase());
        for name in insert
            .into_iter()
            .chain(self.all_tables().into_iter().map(|t| t.name.value.to_lowercase()))
        {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Table of this statement, not its subqueries, referenced by a
    /// qualifier. Aliases win over names.
    pub fn resolve_owner(&self, owner: &str) -> Option<&TableSegment> {
        self.tables
            .iter()
            .find(|table| table.is_referenced_by(owner))
            .or_else(|| {
                self.tables
                    .iter()
                    .find(|table| table.name.value.eq_ignore_ascii_case(owner))
            })
    }

    /// Predicate groups here and in subqueries, with the subquery they come from.
    pub fn all_conditions(&self) -> Vec<&AndPredicate> {
        let mut conditions = self.conditions.iter().collect::<Vec<_>>();
        for subquery in &self.subqueries {
            conditions.extend(subquery.all_conditions());
        }
        conditions
    }

    pub fn all_columns(&self) -> Vec<&ColumnSegment> {
        let mut columns = self.columns.iter().collect::<Vec<_>>();
        for subquery in &self.subqueries {
            columns.extend(subquery.all_columns());
        }
        columns
    }

    pub fn has_subqueries(&self) -> bool {
        !self.subqueries.is_empty()
    }

    /// Statement uses `$1` style parameters.
    pub fn uses_dollar_markers(&self) -> bool {
        let mut markers = vec![];
        for condition in self.all_conditions() {
            for predicate in condition {
                match predicate.operator {
                    Operator::Equal(ref e)
                    | Operator::GreaterThan(ref e)
                    | Operator::GreaterThanOrEqual(ref e)
                    | Operator::LessThan(ref e)
                    | Operator::LessThanOrEqual(ref e) => markers.extend(e.parameters()),
                    Operator::In(ref list) => {
                        markers.extend(list.iter().flat_map(|e| e.parameters()))
                    }
                    Operator::Between { ref low, ref high } => {
                        markers.extend(low.parameters());
                        markers.extend(high.parameters());
                    }
                }
            }
        }
        if let Some(ref insert) = self.insert {
            for row in &insert.rows {
                markers.extend(row.values.iter().flat_map(|v| v.expr.parameters()));
            }
        }
        if let Some(pagination) = self.select.as_ref().and_then(|s| s.pagination.as_ref()) {
            for value in pagination.offset.iter().chain(pagination.row_count.iter()) {
                markers.extend(value.value.parameters());
            }
        }
        markers.iter().any(|m| m.kind == MarkerKind::Dollar)
    }
}
