//! Rewrite tokens derived from a routed statement.

use super::token::{InsertValuesRow, SqlToken, TokenKind};
use super::Error;
use crate::condition::ShardingConditions;
use crate::pagination::PaginationContext;
use crate::route::RouteContext;
use crate::rule::ShardingRule;
use crate::sharding::Value;
use crate::statement::{ColumnRef, PaginationValue, SelectContext, StatementContext};

/// Tokens and parameter changes shared by every route unit.
#[derive(Debug, Default)]
pub struct Generated {
    pub tokens: Vec<SqlToken>,
    /// `?` parameters whose markers are no longer in the text.
    pub removed_parameters: Vec<usize>,
    pub revised_parameters: Vec<(usize, Value)>,
}

pub struct TokenGenerator<'a> {
    rule: &'a ShardingRule,
    stmt: &'a StatementContext,
    route: &'a RouteContext,
    conditions: &'a ShardingConditions,
    pagination: &'a PaginationContext,
}

impl<'a> TokenGenerator<'a> {
    pub fn new(
        rule: &'a ShardingRule,
        stmt: &'a StatementContext,
        route: &'a RouteContext,
        conditions: &'a ShardingConditions,
        pagination: &'a PaginationContext,
    ) -> Self {
        Self {
            rule,
            stmt,
            route,
            conditions,
            pagination,
        }
    }

    pub fn generate(&self) -> Result<Generated, Error> {
        let mut generated = Generated::default();

        self.tables(&mut generated);
        self.owners(&mut generated);
        self.indexes(&mut generated);

        if let Some(ref select) = self.stmt.select {
            if !self.route.is_single() {
                self.projections(select, &mut generated);
                self.order_by(select, &mut generated);
                self.pagination(select, &mut generated)?;
            }
        }

        self.insert(&mut generated)?;

        Ok(generated)
    }

    /// Sharding table referenced by its own name, not through an alias.
    fn named_table(&self, owner: &str) -> Option<String> {
        self.stmt
            .all_tables()
            .into_iter()
            .find(|table| table.alias.is_none() && table.name.value.eq_ignore_ascii_case(owner))
            .filter(|table| self.rule.is_sharding_table(&table.name.value))
            .map(|table| table.name.value.to_lowercase())
    }

    fn tables(&self, generated: &mut Generated) {
        for table in self.stmt.all_tables() {
            if self.rule.is_sharding_table(&table.name.value) {
                generated.tokens.push(SqlToken::substitute(
                    table.name.start,
                    table.name.stop,
                    TokenKind::Table {
                        logic_table: table.name.value.to_lowercase(),
                        quote: table.name.quote,
                    },
                ));
            }
        }
    }

    fn owners(&self, generated: &mut Generated) {
        for column in self.stmt.all_columns() {
            let Some(ref owner) = column.owner else {
                continue;
            };

            // Nothing but a dot is left where the qualifier was.
            if owner.value.is_empty() {
                generated.tokens.push(SqlToken::substitute(
                    owner.start,
                    owner.start,
                    TokenKind::Owner {
                        owner: String::new(),
                        logic_table: None,
                        quote: owner.quote,
                    },
                ));
                continue;
            }

            if let Some(logic_table) = self.named_table(&owner.value) {
                generated.tokens.push(SqlToken::substitute(
                    owner.start,
                    owner.stop + 1,
                    TokenKind::Owner {
                        owner: owner.value.clone(),
                        logic_table: Some(logic_table),
                        quote: owner.quote,
                    },
                ));
            }
        }
    }

    fn indexes(&self, generated: &mut Generated) {
        let default_table = self
            .stmt
            .table_names()
            .into_iter()
            .find(|name| self.rule.is_sharding_table(name));

        let segments = self
            .stmt
            .indexes
            .iter()
            .map(|index| (index, false))
            .chain(self.stmt.constraints.iter().map(|constraint| (constraint, true)));

        for (segment, constraint) in segments {
            let Some(logic_table) = segment
                .table
                .as_ref()
                .map(|table| table.to_lowercase())
                .or(default_table.clone())
                .filter(|table| self.rule.is_sharding_table(table))
            else {
                continue;
            };

            let name = segment.name.value.clone();
            let quote = segment.name.quote;
            let kind = if constraint {
                TokenKind::Constraint {
                    name,
                    logic_table,
                    quote,
                }
            } else {
                TokenKind::Index {
                    name,
                    logic_table,
                    quote,
                }
            };

            generated.tokens.push(SqlToken::substitute(
                segment.name.start,
                segment.name.stop,
                kind,
            ));
        }
    }

    fn derived(&self, column: &ColumnRef, alias: String) -> TokenKind {
        TokenKind::Projection {
            owner: column.owner.clone(),
            logic_table: column
                .owner
                .as_ref()
                .and_then(|owner| self.named_table(owner)),
            column: column.name.clone(),
            alias,
        }
    }

    /// Sort and group columns the merger reads but the select list leaves out.
    fn projections(&self, select: &SelectContext, generated: &mut Generated) {
        if select.shorthand {
            return;
        }
        let Some(stop) = select.projections_stop else {
            return;
        };

        let missing = |column: &&ColumnRef| {
            !select
                .projections
                .iter()
                .any(|projection| projection.provides(column))
        };

        let order_by = select
            .order_by
            .iter()
            .filter_map(|item| item.column())
            .filter(missing)
            .collect::<Vec<_>>();
        let group_by = select
            .group_by_items()
            .iter()
            .filter_map(|item| item.column())
            .filter(missing)
            .filter(|column| !order_by.contains(column))
            .collect::<Vec<_>>();

        let mut children = vec![];
        for (n, column) in order_by.into_iter().enumerate() {
            children.push(self.derived(column, format!("ORDER_BY_DERIVED_{}", n)));
        }
        for (n, column) in group_by.into_iter().enumerate() {
            children.push(self.derived(column, format!("GROUP_BY_DERIVED_{}", n)));
        }

        if !children.is_empty() {
            generated.tokens.push(SqlToken::attach(
                stop + 1,
                TokenKind::Composite {
                    children,
                    continues_list: !select.projections.is_empty(),
                },
            ));
        }
    }

    /// Grouped rows come back sorted by the group so they can be merged in one pass.
    fn order_by(&self, select: &SelectContext, generated: &mut Generated) {
        let Some(ref group_by) = select.group_by else {
            return;
        };
        if group_by.items.is_empty() || !select.order_by.is_empty() {
            return;
        }

        generated.tokens.push(SqlToken::attach(
            group_by.stop + 1,
            TokenKind::OrderBy(group_by.items.clone()),
        ));
    }

    fn pagination(&self, select: &SelectContext, generated: &mut Generated) -> Result<(), Error> {
        if !self.pagination.has_pagination() {
            return Ok(());
        }

        if let Some(offset) = self.pagination.offset() {
            Self::revise(
                offset,
                self.pagination.revised_offset(),
                TokenKind::Offset,
                generated,
            );
        }

        if let Some(row_count) = self.pagination.row_count() {
            Self::revise(
                row_count,
                self.pagination.revised_row_count(select)?,
                TokenKind::RowCount,
                generated,
            );
        }

        Ok(())
    }

    fn revise(
        value: &PaginationValue,
        revised: i64,
        kind: fn(i64) -> TokenKind,
        generated: &mut Generated,
    ) {
        match PaginationContext::parameter_index(value) {
            Some(index) => generated
                .revised_parameters
                .push((index, Value::Integer(revised))),
            None => {
                generated
                    .tokens
                    .push(SqlToken::substitute(value.start, value.stop, kind(revised)));
                generated
                    .removed_parameters
                    .extend(value.value.parameters().into_iter().map(|marker| marker.index));
            }
        }
    }

    fn insert(&self, generated: &mut Generated) -> Result<(), Error> {
        let Some(ref insert) = self.stmt.insert else {
            return Ok(());
        };
        if insert.rows.is_empty() {
            return Ok(());
        }

        let key_column = self
            .rule
            .table_rule(&insert.table)
            .and_then(|table| table.key_generate())
            .map(|key| key.column.clone());
        let generated_keys = self.conditions.has_generated_keys();
        let split_rows = insert.rows.len() > 1 && !self.route.is_single();

        if !generated_keys && !split_rows {
            return Ok(());
        }

        let key_position = key_column
            .as_ref()
            .and_then(|column| insert.column_position(column));

        if generated_keys && key_position.is_none() {
            if let Some(ref column) = key_column {
                let stop = insert
                    .columns_stop
                    .ok_or_else(|| Error::MissingColumnsStop(column.clone()))?;
                generated
                    .tokens
                    .push(SqlToken::attach(stop + 1, TokenKind::InsertColumn(column.clone())));
            }
        }

        let mut rows = vec![];
        for (index, row) in insert.rows.iter().enumerate() {
            let mut values = vec![];
            let mut parameters = vec![];

            for (position, value) in row.values.iter().enumerate() {
                let markers = value
                    .expr
                    .parameters()
                    .into_iter()
                    .map(|marker| marker.index);

                match self.conditions.generated_key(index) {
                    Some(key) if key_position == Some(position) => {
                        values.push(key.sql_literal());
                        generated.removed_parameters.extend(markers);
                    }
                    _ => {
                        values.push(text(&self.stmt.sql, value.start, value.stop));
                        parameters.extend(markers);
                    }
                }
            }

            if key_position.is_none() {
                if let Some(key) = self.conditions.generated_key(index) {
                    values.push(key.sql_literal());
                }
            }

            rows.push(InsertValuesRow {
                values,
                data_nodes: self
                    .route
                    .original_data_nodes()
                    .get(index)
                    .cloned()
                    .unwrap_or_default(),
                parameters,
            });
        }

        let (Some(first), Some(last)) = (insert.rows.first(), insert.rows.last()) else {
            return Ok(());
        };

        generated.tokens.push(SqlToken::substitute(
            first.start,
            last.stop,
            TokenKind::InsertValues {
                logic_table: insert.table.to_lowercase(),
                rows,
            },
        ));

        Ok(())
    }
}

/// Characters `start..=stop` of the statement.
fn text(sql: &str, start: usize, stop: usize) -> String {
    sql.chars()
        .skip(start)
        .take(stop.saturating_sub(start) + 1)
        .collect()
}
