//! Sharding rules.
//!
//! Built once from the rules file and shared read-only
//! between all routing calls.

pub mod binding;
pub mod data_node;
pub mod error;
pub mod strategy;
pub mod table;

pub use binding::BindingTableGroup;
pub use data_node::DataNode;
pub use error::Error;
pub use strategy::{Axis, ShardingStrategy};
pub use table::{KeyGenerate, TableRule};

use std::collections::HashMap;
use std::sync::Arc;

use fnv::FnvHashMap;
use indexmap::IndexMap;

use crate::config::{inline, Config, StrategyConfig};
use crate::keygen::{self, KeyGenerator};
use crate::sharding::Algorithm;

#[derive(Debug, Clone, Default)]
pub struct ShardingRule {
    data_sources: Vec<String>,
    default_data_source: Option<String>,
    tables: IndexMap<String, TableRule>,
    binding_groups: Vec<BindingTableGroup>,
    /// Table name -> binding group.
    binding_index: FnvHashMap<String, usize>,
    broadcast_tables: Vec<String>,
}

impl ShardingRule {
    /// Build rules from configuration.
    pub fn new(config: &Config) -> Result<Self, Error> {
        Self::with_key_generators(config, HashMap::new())
    }

    /// Build rules, adding key generators that aren't built in.
    /// They take precedence over generators declared in the configuration.
    pub fn with_key_generators(
        config: &Config,
        custom: HashMap<String, Arc<dyn KeyGenerator>>,
    ) -> Result<Self, Error> {
        if config.data_sources.is_empty() {
            return Err(Error::NoDataSources);
        }

        let mut data_sources: Vec<String> = vec![];
        for data_source in &config.data_sources {
            if data_sources.contains(data_source) {
                return Err(Error::DuplicateDataSource(data_source.clone()));
            }
            data_sources.push(data_source.clone());
        }

        if let Some(ref default) = config.default_data_source {
            if !data_sources.contains(default) {
                return Err(Error::UnknownDefaultDataSource(default.clone()));
            }
        }

        let mut algorithms = HashMap::new();
        for (name, algorithm) in &config.algorithms {
            let resolved = Algorithm::new(&algorithm.kind, &algorithm.props).map_err(|source| {
                Error::Algorithm {
                    name: name.clone(),
                    source,
                }
            })?;
            algorithms.insert(name.clone(), Arc::new(resolved));
        }

        let mut generators = HashMap::new();
        for (name, generator) in &config.key_generators {
            let resolved = keygen::new(&generator.kind, &generator.props).map_err(|source| {
                Error::KeyGenerator {
                    name: name.clone(),
                    source,
                }
            })?;
            generators.insert(name.clone(), resolved);
        }
        generators.extend(custom);

        let mut tables = IndexMap::new();
        for table in &config.tables {
            let name = table.name.to_lowercase();
            if tables.contains_key(&name) {
                return Err(Error::DuplicateTable(name));
            }

            let data_nodes = match table.actual_data_nodes {
                Some(ref expression) => inline::expand(expression)
                    .map_err(|source| Error::Inline {
                        table: name.clone(),
                        source,
                    })?
                    .iter()
                    .map(|node| node.parse())
                    .collect::<Result<Vec<DataNode>, Error>>()?,
                None => data_sources
                    .iter()
                    .map(|ds| DataNode::new(ds, &table.name))
                    .collect(),
            };

            let strategy = |config: Option<&StrategyConfig>| -> Result<ShardingStrategy, Error> {
                let algorithm = |algorithm: &String| {
                    algorithms
                        .get(algorithm)
                        .cloned()
                        .ok_or_else(|| Error::UnknownAlgorithm {
                            table: name.clone(),
                            algorithm: algorithm.clone(),
                        })
                };

                Ok(match config {
                    Some(StrategyConfig::Standard { column, algorithm: alg }) => {
                        ShardingStrategy::Standard {
                            column: column.to_lowercase(),
                            algorithm: algorithm(alg)?,
                        }
                    }
                    Some(StrategyConfig::Hint { algorithm: alg }) => ShardingStrategy::Hint {
                        algorithm: algorithm(alg)?,
                    },
                    Some(StrategyConfig::None) | None => ShardingStrategy::None,
                })
            };

            let database_strategy = strategy(
                table
                    .database_strategy
                    .as_ref()
                    .or(config.default_database_strategy.as_ref()),
            )?;
            let table_strategy = strategy(
                table
                    .table_strategy
                    .as_ref()
                    .or(config.default_table_strategy.as_ref()),
            )?;

            let key_generate = match table.key_generate {
                Some(ref key) => Some(KeyGenerate {
                    column: key.column.to_lowercase(),
                    generator: generators.get(&key.generator).cloned().ok_or_else(|| {
                        Error::UnknownKeyGenerator {
                            table: name.clone(),
                            generator: key.generator.clone(),
                        }
                    })?,
                }),
                None => None,
            };

            let rule = TableRule::new(
                &name,
                data_nodes,
                &data_sources,
                database_strategy,
                table_strategy,
                key_generate,
            )?;
            tables.insert(name, rule);
        }

        let mut broadcast_tables = vec![];
        for table in &config.broadcast_tables {
            let table = table.to_lowercase();
            if tables.contains_key(&table) {
                return Err(Error::BroadcastAndSharded(table));
            }
            if !broadcast_tables.contains(&table) {
                broadcast_tables.push(table);
            }
        }

        let mut binding_groups = vec![];
        let mut binding_index = FnvHashMap::default();
        for group in &config.binding_tables {
            let group = BindingTableGroup::new(group.clone());
            let Some(primary) = tables.get(group.primary()) else {
                return Err(Error::UnknownBindingTable(group.primary().to_string()));
            };

            for member in group.tables() {
                let rule = tables
                    .get(member)
                    .ok_or_else(|| Error::UnknownBindingTable(member.clone()))?;
                BindingTableGroup::check(primary, rule)?;
                if binding_index
                    .insert(member.clone(), binding_groups.len())
                    .is_some()
                {
                    return Err(Error::DuplicateBinding(member.clone()));
                }
            }

            binding_groups.push(group);
        }

        Ok(Self {
            data_sources,
            default_data_source: config.default_data_source.clone(),
            tables,
            binding_groups,
            binding_index,
            broadcast_tables,
        })
    }

    /// All data sources, in routing order.
    pub fn data_sources(&self) -> &[String] {
        &self.data_sources
    }

    /// Data source for tables without rules.
    pub fn default_data_source(&self) -> Option<&str> {
        self.default_data_source
            .as_deref()
            .or(self.data_sources.first().map(|ds| ds.as_str()))
    }

    /// Position of a data source in routing order.
    pub fn data_source_position(&self, data_source: &str) -> Option<usize> {
        self.data_sources.iter().position(|ds| ds == data_source)
    }

    pub fn table_rule(&self, logic_table: &str) -> Option<&TableRule> {
        self.tables.get(&logic_table.to_lowercase())
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableRule> {
        self.tables.values()
    }

    pub fn is_sharding_table(&self, logic_table: &str) -> bool {
        self.table_rule(logic_table).is_some()
    }

    pub fn is_broadcast_table(&self, logic_table: &str) -> bool {
        self.broadcast_tables
            .iter()
            .any(|table| table.eq_ignore_ascii_case(logic_table))
    }

    pub fn broadcast_tables(&self) -> &[String] {
        &self.broadcast_tables
    }

    pub fn binding_group(&self, logic_table: &str) -> Option<&BindingTableGroup> {
        self.binding_index
            .get(&logic_table.to_lowercase())
            .and_then(|index| self.binding_groups.get(*index))
    }

    pub fn binding_groups(&self) -> &[BindingTableGroup] {
        &self.binding_groups
    }

    /// Are all the tables in the same binding group?
    pub fn is_binding(&self, logic_tables: &[&str]) -> bool {
        let Some(first) = logic_tables.first() else {
            return false;
        };
        let Some(group) = self.binding_group(first) else {
            return false;
        };
        logic_tables.iter().all(|table| group.contains(table))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::config::test::RULES_TOML;
    use crate::sharding::Value;

    pub(crate) fn rule() -> ShardingRule {
        ShardingRule::new(&RULES_TOML.parse().unwrap()).unwrap()
    }

    fn config(extra: &str) -> Config {
        format!("{}\n{}", RULES_TOML, extra).parse().unwrap()
    }

    #[test]
    fn test_rule() {
        let rule = rule();
        assert_eq!(rule.data_sources(), &["ds_0", "ds_1"]);
        assert_eq!(rule.default_data_source(), Some("ds_0"));
        assert!(rule.is_sharding_table("T_ORDER"));
        assert!(rule.is_broadcast_table("t_config"));
        assert!(!rule.is_sharding_table("t_config"));
        assert!(rule.is_binding(&["t_order", "t_order_item"]));
        assert!(!rule.is_binding(&["t_order", "t_config"]));
        assert_eq!(
            rule.binding_group("t_order_item").map(|group| group.primary()),
            Some("t_order")
        );

        let order = rule.table_rule("t_order").unwrap();
        assert_eq!(order.data_nodes().len(), 4);
        assert_eq!(order.sharding_columns(), vec!["user_id", "order_id"]);
        assert_eq!(order.key_generate().map(|k| k.column.as_str()), Some("order_id"));
        assert!(matches!(
            order.key_generate().unwrap().generator.generate().unwrap(),
            Value::Integer(_)
        ));
    }

    #[test]
    fn test_default_nodes() {
        let rule = ShardingRule::new(&config(
            r#"
[[tables]]
name = "t_user"
"#,
        ))
        .unwrap();
        let user = rule.table_rule("t_user").unwrap();
        assert_eq!(
            user.data_nodes(),
            &[DataNode::new("ds_0", "t_user"), DataNode::new("ds_1", "t_user")]
        );
        assert!(matches!(user.database_strategy(), ShardingStrategy::None));
    }

    #[test]
    fn test_unknown_algorithm() {
        let err = ShardingRule::new(&config(
            r#"
[[tables]]
name = "t_user"
table_strategy = { type = "standard", column = "id", algorithm = "missing" }
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, Error::UnknownAlgorithm { .. }), "{:?}", err);
    }

    #[test]
    fn test_invalid_algorithm() {
        let err = ShardingRule::new(&config(
            r#"
[algorithms.broken]
type = "MOD"
props = { sharding-count = 0 }
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, Error::Algorithm { .. }), "{:?}", err);
    }

    #[test]
    fn test_binding_layout() {
        let err = ShardingRule::new(
            &r#"
data_sources = ["ds_0", "ds_1"]
binding_tables = [["t_order", "t_order_item"]]

[[tables]]
name = "t_order"
actual_data_nodes = "ds_${0..1}.t_order_${0..1}"

[[tables]]
name = "t_order_item"
actual_data_nodes = "ds_${0..1}.t_order_item_${0..2}"
"#
            .parse()
            .unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::BindingLayout { .. }), "{:?}", err);
    }

    #[test]
    fn test_broadcast_and_sharded() {
        let err = ShardingRule::new(
            &r#"
data_sources = ["ds_0"]
broadcast_tables = ["t_user"]

[[tables]]
name = "t_user"
"#
            .parse()
            .unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::BroadcastAndSharded(_)));
    }

    #[test]
    fn test_unknown_data_source() {
        let err = ShardingRule::new(
            &r#"
data_sources = ["ds_0"]

[[tables]]
name = "t_user"
actual_data_nodes = "ds_${0..1}.t_user"
"#
            .parse()
            .unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownDataSource { .. }));
    }
}
