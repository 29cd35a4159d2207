//! Extract sharding conditions from a statement.

use tracing::trace;

use super::{
    ConditionValue, Error, ShardingCondition, ShardingConditionValue, ShardingConditions,
};
use crate::rule::ShardingRule;
use crate::sharding::{Value, ValueRange};
use crate::statement::{
    expr, AndPredicate, ColumnRef, Expr, InsertContext, Operator, StatementContext,
    StatementKind,
};

pub struct ConditionEngine<'a> {
    rule: &'a ShardingRule,
    params: &'a [Value],
}

impl<'a> ConditionEngine<'a> {
    pub fn new(rule: &'a ShardingRule, params: &'a [Value]) -> Self {
        Self { rule, params }
    }

    /// Build sharding conditions for the statement.
    ///
    /// No conditions means every data node can hold matching rows.
    pub fn build(&self, stmt: &StatementContext) -> Result<ShardingConditions, Error> {
        if stmt.kind == StatementKind::Insert {
            if let Some(ref insert) = stmt.insert {
                return self.insert(insert);
            }
        }

        let mut conditions = vec![];
        let constrained = self.collect(stmt, &[], &mut conditions)?;
        if !constrained {
            return Ok(ShardingConditions::default());
        }

        let conditions = ShardingConditions::new(conditions);
        if stmt.has_subqueries() {
            conditions.merge_subqueries(self.rule)
        } else {
            Ok(conditions)
        }
    }

    /// One condition per row. Keys are generated for rows that need them
    /// before anything is routed.
    fn insert(&self, insert: &InsertContext) -> Result<ShardingConditions, Error> {
        let Some(table) = self.rule.table_rule(&insert.table) else {
            return Ok(ShardingConditions::insert(vec![], vec![]));
        };

        let key = table.key_generate();
        let key_position = key.and_then(|key| insert.column_position(&key.column));

        let mut conditions = vec![];
        let mut generated_keys = vec![];

        for (row_index, row) in insert.rows.iter().enumerate() {
            let value_at = |position: Option<usize>| -> Result<Option<Value>, Error> {
                match position.and_then(|position| row.values.get(position)) {
                    Some(segment) => self
                        .evaluate(&segment.expr)
                        .map_err(|source| Error::Value {
                            row: row_index,
                            source,
                        }),
                    None => Ok(None),
                }
            };

            let mut generated = None;
            if let Some(key) = key {
                let needs_key = match key_position {
                    Some(position) => matches!(value_at(Some(position))?, Some(Value::Null)),
                    None => !insert.columns.is_empty(),
                };
                if needs_key {
                    generated = Some(key.generator.generate()?);
                }
            }

            let mut condition = ShardingCondition::default();
            for column in table.sharding_columns() {
                let is_key = key.map(|key| key.column == column).unwrap_or(false);
                let value = match generated {
                    Some(ref generated) if is_key => Some(generated.clone()),
                    _ => value_at(insert.column_position(column))?,
                };

                match value {
                    Some(value) if !value.is_null() => {
                        condition.add(ShardingConditionValue {
                            table: table.logic_table().to_string(),
                            column: column.to_string(),
                            value: ConditionValue::List(vec![value]),
                        });
                    }
                    _ => trace!(
                        "insert row {} has no value for \"{}.{}\"",
                        row_index,
                        table.logic_table(),
                        column
                    ),
                }
            }

            conditions.push(condition);
            generated_keys.push(generated);
        }

        Ok(ShardingConditions::insert(conditions, generated_keys))
    }

    /// Collect conditions from the statement and its subqueries.
    ///
    /// Returns false if any of them reads sharding tables without
    /// constraining them, in which case routing has to go everywhere.
    fn collect(
        &self,
        stmt: &StatementContext,
        outer: &[&StatementContext],
        conditions: &mut Vec<ShardingCondition>,
    ) -> Result<bool, Error> {
        let mut scope = vec![stmt];
        scope.extend_from_slice(outer);

        let reads_sharding_tables = stmt
            .tables
            .iter()
            .any(|table| self.rule.is_sharding_table(&table.name.value));

        let mut own = vec![];
        for group in &stmt.conditions {
            let condition = self.and_predicate(&scope, group)?;
            if condition.values.is_empty() {
                // Any unconstrained alternative reaches every node.
                own.clear();
                if reads_sharding_tables {
                    return Ok(false);
                }
                break;
            }
            own.push(condition);
        }

        if own.is_empty() && reads_sharding_tables {
            return Ok(false);
        }
        conditions.extend(own);

        for subquery in &stmt.subqueries {
            if !self.collect(subquery, &scope, conditions)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn and_predicate(
        &self,
        scope: &[&StatementContext],
        predicates: &AndPredicate,
    ) -> Result<ShardingCondition, Error> {
        let mut condition = ShardingCondition::default();

        for predicate in predicates {
            let tables = self.tables_for(scope, &predicate.column);
            if tables.is_empty() {
                continue;
            }

            let Some(value) = self.condition_value(&predicate.operator)? else {
                continue;
            };

            for table in tables {
                let added = condition.add(ShardingConditionValue {
                    table,
                    column: predicate.column.name.to_lowercase(),
                    value: value.clone(),
                });

                if !added {
                    trace!(
                        "contradicting values for \"{}\", routing everywhere",
                        predicate.column.name
                    );
                    return Ok(ShardingCondition::default());
                }
            }
        }

        Ok(condition)
    }

    /// Sharding tables the column belongs to.
    fn tables_for(&self, scope: &[&StatementContext], column: &ColumnRef) -> Vec<String> {
        let is_sharding_column = |table: &str| {
            self.rule
                .table_rule(table)
                .map(|rule| {
                    rule.sharding_columns()
                        .iter()
                        .any(|c| c.eq_ignore_ascii_case(&column.name))
                })
                .unwrap_or(false)
        };

        match column.owner {
            Some(ref owner) => scope
                .iter()
                .find_map(|stmt| stmt.resolve_owner(owner))
                .map(|table| table.name.value.to_lowercase())
                .filter(|table| is_sharding_column(table))
                .into_iter()
                .collect(),

            None => {
                for stmt in scope {
                    let mut tables: Vec<String> = vec![];
                    for table in &stmt.tables {
                        let name = table.name.value.to_lowercase();
                        if is_sharding_column(&name) && !tables.contains(&name) {
                            tables.push(name);
                        }
                    }
                    if !tables.is_empty() {
                        return tables;
                    }
                }
                vec![]
            }
        }
    }

    fn condition_value(&self, operator: &Operator) -> Result<Option<ConditionValue>, Error> {
        let value = |expr: &Expr| -> Result<Option<Value>, Error> {
            Ok(self.evaluate(expr)?.filter(|value| !value.is_null()))
        };

        Ok(match operator {
            Operator::Equal(expr) => value(expr)?.map(|v| ConditionValue::List(vec![v])),

            Operator::In(list) => {
                let mut values = vec![];
                for expr in list {
                    match self.evaluate(expr)? {
                        Some(Value::Null) => (),
                        Some(v) => values.push(v),
                        // One unknown value and the list can't narrow anything.
                        None => return Ok(None),
                    }
                }
                if values.is_empty() {
                    None
                } else {
                    Some(ConditionValue::List(values))
                }
            }

            Operator::Between { low, high } => match (value(low)?, value(high)?) {
                (Some(low), Some(high)) => {
                    Some(ConditionValue::Range(ValueRange::closed(low, high)))
                }
                _ => None,
            },

            Operator::GreaterThan(expr) => {
                value(expr)?.map(|v| ConditionValue::Range(ValueRange::greater_than(v)))
            }
            Operator::GreaterThanOrEqual(expr) => {
                value(expr)?.map(|v| ConditionValue::Range(ValueRange::at_least(v)))
            }
            Operator::LessThan(expr) => {
                value(expr)?.map(|v| ConditionValue::Range(ValueRange::less_than(v)))
            }
            Operator::LessThanOrEqual(expr) => {
                value(expr)?.map(|v| ConditionValue::Range(ValueRange::at_most(v)))
            }
        })
    }

    /// Evaluate a value expression.
    ///
    /// Missing parameters are an error; expressions that can't be evaluated
    /// for other reasons don't narrow routing.
    fn evaluate(&self, expr: &Expr) -> Result<Option<Value>, expr::Error> {
        match expr.evaluate(self.params) {
            Ok(value) => Ok(Some(value)),
            Err(err @ expr::Error::MissingParameter(_)) => Err(err),
            Err(err) => {
                trace!("sharding value skipped: {}", err);
                Ok(None)
            }
        }
    }
}
