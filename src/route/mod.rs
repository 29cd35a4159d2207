//! Statement routing.
//!
//! Turns sharding conditions into route units: the data sources
//! a statement runs on and the actual tables it uses there.

pub mod error;
pub mod standard;
pub mod unit;

pub use error::Error;
pub use standard::StandardRoute;
pub use unit::{RouteContext, RouteMapper, RouteUnit};

use std::time::Instant;

use tracing::debug;

use crate::condition::ShardingConditions;
use crate::hint::Hint;
use crate::rule::{DataNode, ShardingRule, TableRule};
use crate::statement::{StatementContext, StatementKind};

/// Routes statements against one set of sharding rules.
pub struct Router<'a> {
    rule: &'a ShardingRule,
    hint: &'a Hint,
}

/// Route units of one sharding table, or one binding group.
struct RoutedGroup {
    units: Vec<RouteUnit>,
    original_data_nodes: Vec<Vec<DataNode>>,
}

impl<'a> Router<'a> {
    pub fn new(rule: &'a ShardingRule, hint: &'a Hint) -> Self {
        Self { rule, hint }
    }

    /// Route a statement.
    pub fn route(
        &self,
        stmt: &StatementContext,
        conditions: &ShardingConditions,
    ) -> Result<RouteContext, Error> {
        let started = Instant::now();
        let names = stmt.table_names();

        let sharding = names
            .iter()
            .map(|name| name.as_str())
            .filter(|name| self.rule.is_sharding_table(name))
            .collect::<Vec<_>>();
        let broadcast = names
            .iter()
            .map(|name| name.as_str())
            .filter(|name| self.rule.is_broadcast_table(name))
            .collect::<Vec<_>>();

        let context = if sharding.is_empty() {
            let pinned = self.pinned()?;
            if !broadcast.is_empty() && broadcast.len() == names.len() {
                self.broadcast(&broadcast, pinned)
            } else {
                self.unconfigured(&names, stmt.kind, pinned)
            }
        } else {
            let context = self.sharding(&sharding, &broadcast, conditions)?;
            if conditions.is_insert() {
                self.check_insert(sharding[0], &context)?;
            }
            self.pin(context, conditions.is_insert())?
        };

        debug!(
            "routed {} tables to {} units [{:.3}ms]",
            names.len(),
            context.units().len(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(context)
    }

    /// Hinted data source, if it is configured.
    fn pinned(&self) -> Result<Option<&'a str>, Error> {
        match self.hint.pinned_data_source() {
            Some(pinned) if self.rule.data_source_position(pinned).is_none() => {
                Err(Error::HintDataSource(pinned.to_string()))
            }
            pinned => Ok(pinned),
        }
    }

    /// Statement without sharding tables that isn't broadcast only.
    /// Broadcast tables exist on every data source, so it runs where
    /// the unconfigured ones are.
    fn unconfigured(
        &self,
        names: &[String],
        kind: StatementKind,
        pinned: Option<&str>,
    ) -> RouteContext {
        let mappers = names
            .iter()
            .map(|name| RouteMapper::new(name, name))
            .collect::<Vec<_>>();

        // Session and schema statements that name no table apply everywhere.
        if names.is_empty()
            && matches!(kind, StatementKind::Ddl | StatementKind::Other)
            && pinned.is_none()
        {
            let units = self
                .rule
                .data_sources()
                .iter()
                .map(|ds| RouteUnit::new(ds, vec![]))
                .collect();
            return RouteContext::new(units, vec![]);
        }

        let data_source = pinned
            .or(self.rule.default_data_source())
            .unwrap_or_default();

        RouteContext::new(vec![RouteUnit::new(data_source, mappers)], vec![])
    }

    /// Statement using broadcast tables only.
    fn broadcast(&self, tables: &[&str], pinned: Option<&str>) -> RouteContext {
        let mappers = tables
            .iter()
            .map(|table| RouteMapper::new(table, table))
            .collect::<Vec<_>>();

        let data_sources = match pinned {
            Some(pinned) => vec![pinned.to_string()],
            None => self.rule.data_sources().to_vec(),
        };

        let units = data_sources
            .iter()
            .map(|ds| RouteUnit::new(ds, mappers.clone()))
            .collect();

        RouteContext::new(units, vec![])
    }

    fn sharding(
        &self,
        sharding: &[&str],
        broadcast: &[&str],
        conditions: &ShardingConditions,
    ) -> Result<RouteContext, Error> {
        let mut routed = vec![];
        for group in self.groups(sharding) {
            routed.push(self.route_group(&group, conditions)?);
        }

        let (mut units, original_data_nodes) = if routed.len() == 1 {
            let group = routed.remove(0);
            (group.units, group.original_data_nodes)
        } else {
            (self.cartesian(sharding, &routed)?, vec![])
        };

        for unit in units.iter_mut() {
            for table in broadcast {
                unit.push_mapper(RouteMapper::new(table, table));
            }
        }

        Ok(RouteContext::new(units, original_data_nodes))
    }

    /// Split sharding tables into binding groups, keeping statement order.
    fn groups<'b>(&self, sharding: &[&'b str]) -> Vec<Vec<&'b str>> {
        let mut groups: Vec<Vec<&'b str>> = vec![];

        for table in sharding.iter().copied() {
            let group = groups.iter_mut().find(|group| {
                self.rule
                    .binding_group(group[0])
                    .map(|binding| binding.contains(table))
                    .unwrap_or(false)
            });

            match group {
                Some(group) => group.push(table),
                None => groups.push(vec![table]),
            }
        }

        groups
    }

    fn table_rule(&self, table: &str) -> Result<&'a TableRule, Error> {
        self.rule
            .table_rule(table)
            .ok_or_else(|| Error::NoDataNodes(table.to_string()))
    }

    /// Route one group. The primary table is routed and every other member
    /// follows it to the data node in the same position.
    fn route_group(
        &self,
        group: &[&str],
        conditions: &ShardingConditions,
    ) -> Result<RoutedGroup, Error> {
        let anchor = self
            .rule
            .binding_group(group[0])
            .map(|binding| binding.primary())
            .filter(|primary| group.contains(primary))
            .unwrap_or(group[0]);
        let anchor = self.table_rule(anchor)?;

        let (nodes, per_condition) =
            StandardRoute::new(anchor, group.to_vec(), self.hint).route(conditions)?;

        let follow = |table: &str, node: &DataNode| -> Result<DataNode, Error> {
            if table.eq_ignore_ascii_case(anchor.logic_table()) {
                return Ok(node.clone());
            }
            let rule = self.table_rule(table)?;
            anchor
                .position(node)
                .and_then(|(ds, t)| rule.node_at(ds, t))
                .ok_or_else(|| Error::NoDataNodes(table.to_string()))
        };

        let mut units = vec![];
        for node in &nodes {
            let mut mappers = vec![];
            for table in group {
                let actual = follow(table, node)?;
                mappers.push(RouteMapper::new(table, &actual.table));
            }
            units.push(RouteUnit::new(&node.data_source, mappers));
        }

        // Expressed for the first table of the group, the one rows are inserted into.
        let original_data_nodes = per_condition
            .iter()
            .map(|nodes| {
                nodes
                    .iter()
                    .map(|node| follow(group[0], node))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RoutedGroup {
            units,
            original_data_nodes,
        })
    }

    /// Join unrelated groups: every combination of their units
    /// on each data source they have in common.
    fn cartesian(
        &self,
        sharding: &[&str],
        routed: &[RoutedGroup],
    ) -> Result<Vec<RouteUnit>, Error> {
        let mut units = vec![];

        for data_source in self.rule.data_sources() {
            let per_group = routed
                .iter()
                .map(|group| {
                    group
                        .units
                        .iter()
                        .filter(|unit| unit.data_source() == data_source)
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>();

            if per_group.iter().any(|units| units.is_empty()) {
                continue;
            }

            let mut combinations: Vec<Vec<RouteMapper>> = vec![vec![]];
            for group in per_group {
                combinations = combinations
                    .iter()
                    .flat_map(|prefix| {
                        group.iter().map(move |unit| {
                            let mut mappers = prefix.clone();
                            mappers.extend(unit.table_mappers().iter().cloned());
                            mappers
                        })
                    })
                    .collect();
            }

            units.extend(
                combinations
                    .into_iter()
                    .map(|mappers| RouteUnit::new(data_source, mappers)),
            );
        }

        if units.is_empty() {
            return Err(Error::NoCommonDataSource(
                sharding.iter().map(|table| table.to_string()).collect(),
            ));
        }

        Ok(units)
    }

    /// Every inserted row lands on exactly one data node.
    fn check_insert(&self, table: &str, context: &RouteContext) -> Result<(), Error> {
        for (row, nodes) in context.original_data_nodes().iter().enumerate() {
            if nodes.len() != 1 {
                return Err(Error::InsertMultipleNodes {
                    table: table.to_string(),
                    row,
                    nodes: nodes.len(),
                });
            }
        }

        Ok(())
    }

    /// Keep units on the hinted data source only. Every INSERT row
    /// must still have a data node there.
    fn pin(&self, context: RouteContext, insert: bool) -> Result<RouteContext, Error> {
        let Some(pinned) = self.hint.pinned_data_source() else {
            return Ok(context);
        };

        let units = context
            .units()
            .iter()
            .filter(|unit| unit.data_source() == pinned)
            .cloned()
            .collect::<Vec<_>>();

        if units.is_empty() {
            return Err(Error::HintDataSource(pinned.to_string()));
        }

        let mut original_data_nodes = vec![];
        for nodes in context.original_data_nodes() {
            let kept = nodes
                .iter()
                .filter(|node| node.data_source == pinned)
                .cloned()
                .collect::<Vec<_>>();
            if insert && kept.is_empty() {
                return Err(Error::HintDataSource(pinned.to_string()));
            }
            original_data_nodes.push(kept);
        }

        Ok(RouteContext::new(units, original_data_nodes))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::condition::{ConditionValue, ShardingCondition, ShardingConditionValue};
    use crate::rule::test::rule;
    use crate::sharding::Value;
    use crate::statement::TableSegment;

    fn select(tables: &[&str]) -> StatementContext {
        let mut stmt = StatementContext::new("SELECT", StatementKind::Select);
        for table in tables {
            stmt = stmt.table(TableSegment::new(0, table));
        }
        stmt
    }

    fn equal(table: &str, values: &[(&str, i64)]) -> ShardingCondition {
        ShardingCondition {
            values: values
                .iter()
                .map(|(column, value)| ShardingConditionValue {
                    table: table.to_string(),
                    column: column.to_string(),
                    value: ConditionValue::List(vec![Value::from(*value)]),
                })
                .collect(),
        }
    }

    fn units(context: &RouteContext) -> Vec<String> {
        context.units().iter().map(|unit| unit.to_string()).collect()
    }

    #[test]
    fn test_single_node() {
        let rule = rule();
        let hint = Hint::default();
        let conditions =
            ShardingConditions::new(vec![equal("t_order", &[("user_id", 1), ("order_id", 5)])]);
        let context = Router::new(&rule, &hint)
            .route(&select(&["t_order"]), &conditions)
            .unwrap();
        assert_eq!(units(&context), vec!["ds_1 [t_order -> t_order_1]"]);
    }

    #[test]
    fn test_binding() {
        let rule = rule();
        let hint = Hint::default();
        let conditions = ShardingConditions::new(vec![equal("t_order_item", &[("order_id", 4)])]);
        let context = Router::new(&rule, &hint)
            .route(&select(&["t_order", "t_order_item"]), &conditions)
            .unwrap();
        assert_eq!(
            units(&context),
            vec![
                "ds_0 [t_order -> t_order_0, t_order_item -> t_order_item_0]",
                "ds_1 [t_order -> t_order_0, t_order_item -> t_order_item_0]",
            ]
        );
    }

    #[test]
    fn test_broadcast() {
        let rule = rule();
        let hint = Hint::default();

        let context = Router::new(&rule, &hint)
            .route(&select(&["t_config"]), &ShardingConditions::default())
            .unwrap();
        assert_eq!(
            units(&context),
            vec!["ds_0 [t_config -> t_config]", "ds_1 [t_config -> t_config]"]
        );

        let update = StatementContext::new("UPDATE", StatementKind::Update)
            .table(TableSegment::new(0, "t_config"));
        let context = Router::new(&rule, &hint)
            .route(&update, &ShardingConditions::default())
            .unwrap();
        assert_eq!(context.data_sources(), vec!["ds_0", "ds_1"]);
    }

    #[test]
    fn test_broadcast_joined() {
        let rule = rule();
        let hint = Hint::default();
        let conditions =
            ShardingConditions::new(vec![equal("t_order", &[("user_id", 0), ("order_id", 0)])]);
        let context = Router::new(&rule, &hint)
            .route(&select(&["t_order", "t_config"]), &conditions)
            .unwrap();
        assert_eq!(
            units(&context),
            vec!["ds_0 [t_order -> t_order_0, t_config -> t_config]"]
        );
    }

    #[test]
    fn test_unconfigured() {
        let rule = rule();
        let hint = Hint::default();
        let context = Router::new(&rule, &hint)
            .route(&select(&["t_user"]), &ShardingConditions::default())
            .unwrap();
        assert_eq!(units(&context), vec!["ds_0 [t_user -> t_user]"]);

        let set = StatementContext::new("SET x = 1", StatementKind::Other);
        let context = Router::new(&rule, &hint)
            .route(&set, &ShardingConditions::default())
            .unwrap();
        assert_eq!(context.data_sources(), vec!["ds_0", "ds_1"]);
    }

    #[test]
    fn test_broadcast_with_unconfigured() {
        let rule = rule();
        let hint = Hint::default();
        let context = Router::new(&rule, &hint)
            .route(&select(&["t_config", "t_user"]), &ShardingConditions::default())
            .unwrap();
        assert_eq!(
            units(&context),
            vec!["ds_0 [t_config -> t_config, t_user -> t_user]"]
        );

        let hint = Hint::default().data_source("ds_1");
        let context = Router::new(&rule, &hint)
            .route(&select(&["t_config", "t_user"]), &ShardingConditions::default())
            .unwrap();
        assert_eq!(context.data_sources(), vec!["ds_1"]);
    }

    #[test]
    fn test_pinned_unknown_data_source() {
        let rule = rule();
        let hint = Hint::default().data_source("ds_9");

        let cases: [&[&str]; 4] = [&["t_config"], &["t_user"], &[], &["t_order"]];
        for tables in cases {
            let err = Router::new(&rule, &hint)
                .route(&select(tables), &ShardingConditions::default())
                .unwrap_err();
            assert!(
                matches!(err, Error::HintDataSource(ref name) if name == "ds_9"),
                "{:?}",
                err
            );
        }
    }

    #[test]
    fn test_pinned_insert_row_elsewhere() {
        let rule = rule();
        let hint = Hint::default().data_source("ds_1");
        let mut stmt = StatementContext::new("INSERT", StatementKind::Insert)
            .table(TableSegment::new(0, "t_order"));
        stmt.insert = Some(crate::statement::InsertContext {
            table: "t_order".into(),
            ..Default::default()
        });

        let conditions = ShardingConditions::insert(
            vec![
                equal("t_order", &[("user_id", 1), ("order_id", 1)]),
                equal("t_order", &[("user_id", 0), ("order_id", 1)]),
            ],
            vec![None, None],
        );
        let err = Router::new(&rule, &hint)
            .route(&stmt, &conditions)
            .unwrap_err();
        assert!(matches!(err, Error::HintDataSource(_)), "{:?}", err);
    }

    #[test]
    fn test_insert_multiple_nodes() {
        let rule = rule();
        let hint = Hint::default();
        let mut stmt = StatementContext::new("INSERT", StatementKind::Insert);
        stmt.insert = Some(crate::statement::InsertContext {
            table: "t_order".into(),
            ..Default::default()
        });

        let conditions = ShardingConditions::insert(
            vec![
                equal("t_order", &[("user_id", 0), ("order_id", 1)]),
                equal("t_order", &[("order_id", 1)]),
            ],
            vec![None, None],
        );
        let err = Router::new(&rule, &hint)
            .route(&stmt, &conditions)
            .unwrap_err();
        assert!(
            matches!(err, Error::InsertMultipleNodes { row: 1, nodes: 2, .. }),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_pinned() {
        let rule = rule();
        let hint = Hint::default().data_source("ds_1");
        let context = Router::new(&rule, &hint)
            .route(&select(&["t_order"]), &ShardingConditions::default())
            .unwrap();
        assert_eq!(context.data_sources(), vec!["ds_1"]);
        assert_eq!(context.units().len(), 2);

        let conditions = ShardingConditions::new(vec![equal("t_order", &[("user_id", 0)])]);
        let err = Router::new(&rule, &hint)
            .route(&select(&["t_order"]), &conditions)
            .unwrap_err();
        assert!(matches!(err, Error::HintDataSource(_)));
    }

    #[test]
    fn test_cartesian() {
        let config = format!(
            "{}\n{}",
            crate::config::test::RULES_TOML,
            r#"
[[tables]]
name = "t_user"
actual_data_nodes = "ds_1.t_user_${0..1}"
"#
        );
        let rule = ShardingRule::new(&config.parse().unwrap()).unwrap();
        let hint = Hint::default();
        let conditions = ShardingConditions::new(vec![equal("t_order", &[("order_id", 1)])]);
        let context = Router::new(&rule, &hint)
            .route(&select(&["t_order", "t_user"]), &conditions)
            .unwrap();
        assert_eq!(
            units(&context),
            vec![
                "ds_1 [t_order -> t_order_1, t_user -> t_user_0]",
                "ds_1 [t_order -> t_order_1, t_user -> t_user_1]",
            ]
        );
    }
}
