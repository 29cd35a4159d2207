//! Routing and rewriting a statement in one call.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::condition::{ConditionEngine, ShardingConditions};
use crate::config;
use crate::hint::{self, Hint};
use crate::rewrite::{RewriteEngine, RewriteUnit};
use crate::route::{RouteContext, RouteUnit, Router};
use crate::rule::ShardingRule;
use crate::sharding::Value;
use crate::statement::StatementContext;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Condition(#[from] crate::condition::Error),

    #[error("{0}")]
    Route(#[from] crate::route::Error),

    #[error("{0}")]
    Rewrite(#[from] crate::rewrite::Error),
}

/// Statement for one data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionUnit {
    pub data_source: String,
    /// Logical table -> actual table.
    pub tables: Vec<(String, String)>,
    pub sql: String,
    pub parameters: Vec<Value>,
    /// Keys generated for the INSERT rows sent to this unit, in row order.
    pub generated_keys: Vec<Value>,
}

impl ExecutionUnit {
    fn new(unit: &RouteUnit, rewritten: RewriteUnit, generated_keys: Vec<Value>) -> Self {
        Self {
            data_source: unit.data_source().to_string(),
            tables: unit
                .table_mappers()
                .iter()
                .map(|mapper| (mapper.logic_name.clone(), mapper.actual_name.clone()))
                .collect(),
            sql: rewritten.sql,
            parameters: rewritten.parameters,
            generated_keys,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub units: Vec<ExecutionUnit>,
    /// Keys generated for INSERT rows, in row order.
    pub generated_keys: Vec<Value>,
}

/// Plans statements against one version of the sharding rules.
#[derive(Debug, Clone)]
pub struct Planner {
    rule: Arc<ShardingRule>,
}

impl Planner {
    pub fn new(rule: Arc<ShardingRule>) -> Self {
        Self { rule }
    }

    /// Planner using the rules currently loaded.
    pub fn from_config() -> Self {
        Self::new(config::rules())
    }

    pub fn rule(&self) -> &ShardingRule {
        &self.rule
    }

    /// Route and rewrite a statement.
    ///
    /// A `SHARDING_HINT` comment in the statement is combined with `hint`.
    pub fn plan(
        &self,
        stmt: &StatementContext,
        params: &[Value],
        hint: Option<&Hint>,
    ) -> Result<Plan, Error> {
        let started = Instant::now();

        let hint = match (hint::parse_comment(&stmt.sql), hint) {
            (Some(comment), Some(hint)) => comment.merge(hint.clone()),
            (Some(comment), None) => comment,
            (None, Some(hint)) => hint.clone(),
            (None, None) => Hint::default(),
        };

        let conditions = ConditionEngine::new(&self.rule, params).build(stmt)?;
        let route = Router::new(&self.rule, &hint).route(stmt, &conditions)?;

        let rewritten = if hint.skips_rewrite() {
            route
                .units()
                .iter()
                .map(|_| RewriteUnit {
                    sql: stmt.sql.clone(),
                    parameters: params.to_vec(),
                })
                .collect()
        } else {
            RewriteEngine::new(&self.rule, stmt, &route, &conditions, params).rewrite()?
        };

        let units = route
            .units()
            .iter()
            .zip(rewritten)
            .map(|(unit, rewritten)| {
                let keys = generated_keys(stmt, &route, &conditions, unit);
                ExecutionUnit::new(unit, rewritten, keys)
            })
            .collect::<Vec<_>>();

        debug!(
            "planned {:?} on {} units [{:.3}ms]",
            stmt.kind,
            units.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Plan {
            units,
            generated_keys: conditions.generated_keys(),
        })
    }
}

/// Generated keys of the INSERT rows routed to a unit.
fn generated_keys(
    stmt: &StatementContext,
    route: &RouteContext,
    conditions: &ShardingConditions,
    unit: &RouteUnit,
) -> Vec<Value> {
    let Some(ref insert) = stmt.insert else {
        return vec![];
    };
    if !conditions.has_generated_keys() {
        return vec![];
    }

    route
        .conditions_on(unit, &insert.table)
        .into_iter()
        .filter_map(|row| conditions.generated_key(row).cloned())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rule::test::rule;
    use crate::statement::{ColumnRef, Expr, Predicate, StatementKind, TableSegment};

    fn planner() -> Planner {
        Planner::new(Arc::new(rule()))
    }

    #[test]
    fn test_plan_single() {
        let sql = "SELECT * FROM t_order WHERE user_id = ? AND order_id = ?";
        let stmt = StatementContext::new(sql, StatementKind::Select)
            .table(TableSegment::new(14, "t_order"))
            .condition(vec![
                Predicate::equal(ColumnRef::new("user_id"), Expr::param(0)),
                Predicate::equal(ColumnRef::new("order_id"), Expr::param(1)),
            ]);

        let plan = planner()
            .plan(&stmt, &[Value::from(1), Value::from(2)], None)
            .unwrap();
        assert_eq!(plan.units.len(), 1);
        assert_eq!(plan.units[0].data_source, "ds_1");
        assert_eq!(
            plan.units[0].sql,
            "SELECT * FROM t_order_0 WHERE user_id = ? AND order_id = ?"
        );
        assert_eq!(plan.units[0].parameters, vec![Value::from(1), Value::from(2)]);
        assert!(plan.generated_keys.is_empty());
    }

    #[test]
    fn test_skip_rewrite_comment() {
        let sql = "/* SHARDING_HINT: DATASOURCE_NAME=ds_1, SKIP_SQL_REWRITE=true */ SELECT * FROM t_order";
        let stmt = StatementContext::new(sql, StatementKind::Select)
            .table(TableSegment::new(79, "t_order"));

        let plan = planner().plan(&stmt, &[], None).unwrap();
        assert_eq!(plan.units.len(), 2);
        assert!(plan.units.iter().all(|unit| unit.data_source == "ds_1"));
        assert!(plan.units.iter().all(|unit| unit.sql == sql));
    }

    #[test]
    fn test_hint_argument() {
        let sql = "SELECT * FROM t_order";
        let stmt = StatementContext::new(sql, StatementKind::Select)
            .table(TableSegment::new(14, "t_order"));
        let hint = Hint::default()
            .database_value(None, 0)
            .table_value(Some("t_order"), 1);

        let plan = planner().plan(&stmt, &[], Some(&hint)).unwrap();
        assert_eq!(plan.units.len(), 1);
        assert_eq!(plan.units[0].sql, "SELECT * FROM t_order_1");
        assert_eq!(plan.units[0].data_source, "ds_0");
    }
}
