//! Route one logical table to its data nodes.

use tracing::trace;

use super::Error;
use crate::condition::{ConditionValue, ShardingCondition, ShardingConditions};
use crate::hint::Hint;
use crate::rule::{Axis, DataNode, ShardingStrategy, TableRule};
use crate::sharding::Value;

pub struct StandardRoute<'a> {
    table: &'a TableRule,
    /// Tables whose sharding values apply: the table itself
    /// or every member of its binding group in the statement.
    condition_tables: Vec<&'a str>,
    hint: &'a Hint,
}

impl<'a> StandardRoute<'a> {
    pub fn new(table: &'a TableRule, condition_tables: Vec<&'a str>, hint: &'a Hint) -> Self {
        Self {
            table,
            condition_tables,
            hint,
        }
    }

    /// Data nodes for the statement, and for each condition separately.
    pub fn route(
        &self,
        conditions: &ShardingConditions,
    ) -> Result<(Vec<DataNode>, Vec<Vec<DataNode>>), Error> {
        if conditions.is_empty() {
            return Ok((self.route_condition(None)?, vec![]));
        }

        let mut nodes: Vec<DataNode> = vec![];
        let mut per_condition = vec![];

        for condition in conditions.conditions() {
            let routed = self.route_condition(Some(condition))?;
            for node in &routed {
                if !nodes.contains(node) {
                    nodes.push(node.clone());
                }
            }
            per_condition.push(routed);
        }

        nodes.sort_by_key(|node| self.table.position(node));

        Ok((nodes, per_condition))
    }

    fn route_condition(
        &self,
        condition: Option<&ShardingCondition>,
    ) -> Result<Vec<DataNode>, Error> {
        let data_sources = self.route_axis(
            Axis::Database,
            self.table.database_strategy(),
            condition,
            &self.table.data_sources(),
        )?;

        let mut nodes = vec![];
        for data_source in data_sources {
            let tables = self.route_axis(
                Axis::Table,
                self.table.table_strategy(),
                condition,
                self.table.tables(&data_source),
            )?;
            nodes.extend(
                tables
                    .into_iter()
                    .map(|table| DataNode::new(&data_source, table)),
            );
        }

        // A data source without matching tables is dropped, as long as one remains.
        if nodes.is_empty() {
            return Err(Error::NoTargets {
                table: self.table.logic_table().to_string(),
                axis: Axis::Table,
            });
        }

        trace!(
            "{} -> [{}]",
            self.table.logic_table(),
            nodes
                .iter()
                .map(|node| node.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(nodes)
    }

    fn hinted(&self, axis: Axis) -> Vec<Value> {
        let mut values = vec![];
        for table in &self.condition_tables {
            let hinted = match axis {
                Axis::Database => self.hint.database_values(table),
                Axis::Table => self.hint.table_values(table),
            };
            for value in hinted {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
        values
    }

    fn route_axis(
        &self,
        axis: Axis,
        strategy: &ShardingStrategy,
        condition: Option<&ShardingCondition>,
        available: &[String],
    ) -> Result<Vec<String>, Error> {
        let logic_table = self.table.logic_table();

        let targets = match strategy {
            ShardingStrategy::None => available.to_vec(),

            ShardingStrategy::Hint { algorithm } => {
                let hinted = self.hinted(axis);
                if hinted.is_empty() {
                    available.to_vec()
                } else {
                    algorithm.hint(available, logic_table, &hinted)?
                }
            }

            ShardingStrategy::Standard { column, algorithm } => {
                match condition.and_then(|c| c.value(&self.condition_tables, column)) {
                    Some(ConditionValue::List(values)) => {
                        let mut matched = vec![];
                        for value in values {
                            if let Some(target) =
                                algorithm.precise(available, logic_table, value)?
                            {
                                matched.push(target);
                            }
                        }
                        available
                            .iter()
                            .filter(|target| matched.contains(target))
                            .cloned()
                            .collect()
                    }
                    Some(ConditionValue::Range(range)) => {
                        algorithm.range(available, logic_table, range)?
                    }
                    // No predicate on the column, a hint can still narrow it.
                    None => {
                        let hinted = self.hinted(axis);
                        if hinted.is_empty() {
                            available.to_vec()
                        } else {
                            algorithm.hint(available, logic_table, &hinted)?
                        }
                    }
                }
            }
        };

        if targets.is_empty() && axis == Axis::Database {
            return Err(Error::NoTargets {
                table: logic_table.to_string(),
                axis,
            });
        }

        Ok(targets)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::condition::ShardingConditionValue;
    use crate::rule::test::rule;
    use crate::sharding::ValueRange;

    fn condition(values: &[(&str, ConditionValue)]) -> ShardingCondition {
        ShardingCondition {
            values: values
                .iter()
                .map(|(column, value)| ShardingConditionValue {
                    table: "t_order".into(),
                    column: column.to_string(),
                    value: value.clone(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_full_route() {
        let rule = rule();
        let hint = Hint::default();
        let route = StandardRoute::new(rule.table_rule("t_order").unwrap(), vec!["t_order"], &hint);
        let (nodes, per_condition) = route.route(&ShardingConditions::default()).unwrap();
        assert_eq!(
            nodes.iter().map(|n| n.to_string()).collect::<Vec<_>>(),
            vec![
                "ds_0.t_order_0",
                "ds_0.t_order_1",
                "ds_1.t_order_0",
                "ds_1.t_order_1"
            ]
        );
        assert!(per_condition.is_empty());
    }

    #[test]
    fn test_precise_and_range() {
        let rule = rule();
        let hint = Hint::default();
        let route = StandardRoute::new(rule.table_rule("t_order").unwrap(), vec!["t_order"], &hint);

        let conditions = ShardingConditions::new(vec![condition(&[
            ("user_id", ConditionValue::List(vec![Value::from(3)])),
            (
                "order_id",
                ConditionValue::Range(ValueRange::closed(Value::from(4), Value::from(5))),
            ),
        ])]);
        let (nodes, _) = route.route(&conditions).unwrap();
        assert_eq!(
            nodes,
            vec![
                DataNode::new("ds_1", "t_order_0"),
                DataNode::new("ds_1", "t_order_1")
            ]
        );
    }

    #[test]
    fn test_union_of_conditions() {
        let rule = rule();
        let hint = Hint::default();
        let route = StandardRoute::new(rule.table_rule("t_order").unwrap(), vec!["t_order"], &hint);

        let conditions = ShardingConditions::new(vec![
            condition(&[
                ("user_id", ConditionValue::List(vec![Value::from(1)])),
                ("order_id", ConditionValue::List(vec![Value::from(1)])),
            ]),
            condition(&[
                ("user_id", ConditionValue::List(vec![Value::from(0)])),
                ("order_id", ConditionValue::List(vec![Value::from(0)])),
            ]),
        ]);
        let (nodes, per_condition) = route.route(&conditions).unwrap();
        assert_eq!(
            nodes,
            vec![
                DataNode::new("ds_0", "t_order_0"),
                DataNode::new("ds_1", "t_order_1")
            ]
        );
        assert_eq!(per_condition[0], vec![DataNode::new("ds_1", "t_order_1")]);
    }

    #[test]
    fn test_hint_without_predicate() {
        let rule = rule();
        let hint = Hint::default().database_value(Some("t_order"), 1);
        let route = StandardRoute::new(rule.table_rule("t_order").unwrap(), vec!["t_order"], &hint);
        let (nodes, _) = route.route(&ShardingConditions::default()).unwrap();
        assert!(nodes.iter().all(|node| node.data_source == "ds_1"));
        assert_eq!(nodes.len(), 2);
    }
}
