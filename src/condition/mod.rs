//! Sharding conditions.
//!
//! One condition per alternative of the WHERE clause, or per row of an
//! INSERT. Each one carries the values known for the sharding columns
//! it constrains.

pub mod engine;
pub mod error;

pub use engine::ConditionEngine;
pub use error::Error;

use crate::rule::ShardingRule;
use crate::sharding::{Value, ValueRange};

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// Column equals one of the values.
    List(Vec<Value>),
    /// Column is inside the range.
    Range(ValueRange),
}

impl ConditionValue {
    /// Combine two constraints on the same column.
    ///
    /// `None` means the column can't satisfy both, e.g. `id = 1 AND id = 2`.
    pub fn intersect(&self, other: &ConditionValue) -> Option<ConditionValue> {
        match (self, other) {
            (Self::List(a), Self::List(b)) => {
                let values = a
                    .iter()
                    .filter(|value| b.contains(value))
                    .cloned()
                    .collect::<Vec<_>>();
                if values.is_empty() {
                    None
                } else {
                    Some(Self::List(values))
                }
            }
            (Self::List(list), Self::Range(range)) | (Self::Range(range), Self::List(list)) => {
                // Values that can't be compared with the range are kept.
                let values = list
                    .iter()
                    .filter(|value| range.contains(value).unwrap_or(true))
                    .cloned()
                    .collect::<Vec<_>>();
                if values.is_empty() {
                    None
                } else {
                    Some(Self::List(values))
                }
            }
            (Self::Range(a), Self::Range(b)) => Some(Self::Range(a.intersect(b))),
        }
    }

    /// Same constraint, ignoring list order.
    fn equivalent(&self, other: &ConditionValue) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().all(|value| b.contains(value))
            }
            (a, b) => a == b,
        }
    }
}

/// Constraint on one sharding column of one logical table.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardingConditionValue {
    pub table: String,
    pub column: String,
    pub value: ConditionValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardingCondition {
    pub values: Vec<ShardingConditionValue>,
}

impl ShardingCondition {
    /// Constraint on a column of any of the tables.
    pub fn value(&self, tables: &[&str], column: &str) -> Option<&ConditionValue> {
        self.values
            .iter()
            .find(|value| {
                value.column.eq_ignore_ascii_case(column)
                    && tables.iter().any(|t| t.eq_ignore_ascii_case(&value.table))
            })
            .map(|value| &value.value)
    }

    /// Add a constraint, narrowing an existing one on the same column.
    ///
    /// Returns false if the constraints contradict each other.
    pub fn add(&mut self, value: ShardingConditionValue) -> bool {
        let existing = self.values.iter_mut().find(|existing| {
            existing.table.eq_ignore_ascii_case(&value.table)
                && existing.column.eq_ignore_ascii_case(&value.column)
        });

        match existing {
            Some(existing) => match existing.value.intersect(&value.value) {
                Some(intersection) => {
                    existing.value = intersection;
                    true
                }
                None => false,
            },
            None => {
                self.values.push(value);
                true
            }
        }
    }

    /// Same constraints, treating binding tables as the same table.
    fn equivalent(&self, other: &ShardingCondition, rule: &ShardingRule) -> bool {
        let same_table = |a: &str, b: &str| a.eq_ignore_ascii_case(b) || rule.is_binding(&[a, b]);

        self.values.len() == other.values.len()
            && self.values.iter().all(|value| {
                other.values.iter().any(|candidate| {
                    same_table(&value.table, &candidate.table)
                        && value.column.eq_ignore_ascii_case(&candidate.column)
                        && value.value.equivalent(&candidate.value)
                })
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardingConditions {
    conditions: Vec<ShardingCondition>,
    /// Generated key for each INSERT row, if it needed one.
    generated_keys: Vec<Option<Value>>,
    insert: bool,
}

impl ShardingConditions {
    pub fn new(conditions: Vec<ShardingCondition>) -> Self {
        Self {
            conditions,
            generated_keys: vec![],
            insert: false,
        }
    }

    /// One condition per INSERT row, with keys generated for them.
    pub fn insert(conditions: Vec<ShardingCondition>, generated_keys: Vec<Option<Value>>) -> Self {
        Self {
            conditions,
            generated_keys,
            insert: true,
        }
    }

    pub fn conditions(&self) -> &[ShardingCondition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn is_insert(&self) -> bool {
        self.insert
    }

    /// Keys generated for INSERT rows, in row order.
    pub fn generated_keys(&self) -> Vec<Value> {
        self.generated_keys.iter().flatten().cloned().collect()
    }

    /// Key generated for an INSERT row.
    pub fn generated_key(&self, row: usize) -> Option<&Value> {
        self.generated_keys.get(row).and_then(|key| key.as_ref())
    }

    pub fn has_generated_keys(&self) -> bool {
        self.generated_keys.iter().any(|key| key.is_some())
    }

    /// Collapse conditions coming from a statement and its subqueries.
    ///
    /// They must all agree, otherwise the subquery could
    /// read rows from data nodes the outer query doesn't touch.
    pub fn merge_subqueries(self, rule: &ShardingRule) -> Result<Self, Error> {
        if self.conditions.len() <= 1 {
            return Ok(self);
        }

        let first = &self.conditions[0];
        if self.conditions[1..]
            .iter()
            .all(|condition| first.equivalent(condition, rule))
        {
            let first = first.clone();
            Ok(Self {
                conditions: vec![first],
                ..self
            })
        } else {
            Err(Error::SubqueryConditionMismatch)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn value(table: &str, column: &str, value: ConditionValue) -> ShardingConditionValue {
        ShardingConditionValue {
            table: table.into(),
            column: column.into(),
            value,
        }
    }

    #[test]
    fn test_intersect() {
        let list = ConditionValue::List(vec![Value::from(1), Value::from(5), Value::from(9)]);
        let range = ConditionValue::Range(ValueRange::closed(Value::from(2), Value::from(9)));
        assert_eq!(
            list.intersect(&range),
            Some(ConditionValue::List(vec![Value::from(5), Value::from(9)]))
        );

        let other = ConditionValue::List(vec![Value::from(2)]);
        assert_eq!(list.intersect(&other), None);
    }

    #[test]
    fn test_add_contradiction() {
        let mut condition = ShardingCondition::default();
        assert!(condition.add(value(
            "t_order",
            "order_id",
            ConditionValue::List(vec![Value::from(1)])
        )));
        assert!(!condition.add(value(
            "t_order",
            "order_id",
            ConditionValue::List(vec![Value::from(2)])
        )));
        assert_eq!(
            condition.value(&["t_order"], "ORDER_ID"),
            Some(&ConditionValue::List(vec![Value::from(1)]))
        );
        assert_eq!(condition.value(&["t_order_item"], "order_id"), None);
    }
}
