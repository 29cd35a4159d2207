//! Configuration.

pub mod error;
pub mod inline;

pub use error::Error;

use std::collections::BTreeMap;
use std::fs::read_to_string;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::rule::ShardingRule;
use crate::sharding::Props;

static RULES: Lazy<ArcSwap<ShardingRule>> =
    Lazy::new(|| ArcSwap::from_pointee(ShardingRule::default()));

/// Currently loaded sharding rules.
pub fn rules() -> Arc<ShardingRule> {
    RULES.load().clone()
}

/// Load the rules file from disk and make it current.
pub fn load(path: &Path) -> Result<Arc<ShardingRule>, Error> {
    let config = Config::load(path)?;
    let rule = Arc::new(ShardingRule::new(&config)?);
    RULES.store(rule.clone());
    info!(
        "loaded {} sharding tables on {} data sources from \"{}\"",
        rule.tables().count(),
        rule.data_sources().len(),
        path.display()
    );
    Ok(rule)
}

/// Replace the current rules, e.g. after building them in code.
pub fn set(rule: ShardingRule) -> Arc<ShardingRule> {
    let rule = Arc::new(rule);
    RULES.store(rule.clone());
    rule
}

/// Rules file, e.g. `sharding.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Data source names, in routing order.
    pub data_sources: Vec<String>,
    /// Data source for tables without rules. Defaults to the first one.
    #[serde(default)]
    pub default_data_source: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
    /// Groups of tables sharded identically, e.g. `[["t_order", "t_order_item"]]`.
    #[serde(default)]
    pub binding_tables: Vec<Vec<String>>,
    /// Tables present in full on every data source.
    #[serde(default)]
    pub broadcast_tables: Vec<String>,
    #[serde(default)]
    pub default_database_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub default_table_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub algorithms: BTreeMap<String, AlgorithmConfig>,
    #[serde(default)]
    pub key_generators: BTreeMap<String, AlgorithmConfig>,
}

impl Config {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let source = read_to_string(path)?;
        source.parse()
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        toml::from_str(source).map_err(|err| Error::config(source, err))
    }
}

/// Logical table.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    /// Logical name used in queries.
    pub name: String,
    /// Inline expression, e.g. `ds_${0..1}.t_order_${0..1}`.
    /// Without it, the table exists under its logical name on every data source.
    #[serde(default)]
    pub actual_data_nodes: Option<String>,
    #[serde(default)]
    pub database_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub table_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub key_generate: Option<KeyGenerateConfig>,
}

/// How one axis (database or table) is sharded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum StrategyConfig {
    /// Values come from a column in the query.
    Standard { column: String, algorithm: String },
    /// Values come from a hint.
    Hint { algorithm: String },
    /// Not sharded on this axis.
    None,
}

/// Algorithm or key generator definition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AlgorithmConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub props: Props,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct KeyGenerateConfig {
    pub column: String,
    pub generator: String,
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) const RULES_TOML: &str = r#"
data_sources = ["ds_0", "ds_1"]
broadcast_tables = ["t_config"]
binding_tables = [["t_order", "t_order_item"]]

[[tables]]
name = "t_order"
actual_data_nodes = "ds_${0..1}.t_order_${0..1}"
database_strategy = { type = "standard", column = "user_id", algorithm = "database_mod" }
table_strategy = { type = "standard", column = "order_id", algorithm = "table_mod" }
key_generate = { column = "order_id", generator = "snowflake" }

[[tables]]
name = "t_order_item"
actual_data_nodes = "ds_${0..1}.t_order_item_${0..1}"
database_strategy = { type = "standard", column = "user_id", algorithm = "database_mod" }
table_strategy = { type = "standard", column = "order_id", algorithm = "table_mod" }

[algorithms.database_mod]
type = "MOD"
props = { sharding-count = 2 }

[algorithms.table_mod]
type = "MOD"
props = { sharding-count = 2 }

[key_generators.snowflake]
type = "SNOWFLAKE"
props = { worker-id = 1 }
"#;

    #[test]
    fn test_parse() {
        let config: Config = RULES_TOML.parse().unwrap();
        assert_eq!(config.data_sources, vec!["ds_0", "ds_1"]);
        assert_eq!(config.tables.len(), 2);
        assert_eq!(
            config.tables[0].database_strategy,
            Some(StrategyConfig::Standard {
                column: "user_id".into(),
                algorithm: "database_mod".into()
            })
        );
        assert_eq!(config.algorithms["table_mod"].kind, "MOD");
        assert_eq!(
            config.key_generators["snowflake"]
                .props
                .int("worker-id")
                .unwrap(),
            Some(1)
        );
    }

    #[test]
    fn test_strategy_none() {
        let config: Config = r#"
data_sources = ["ds_0"]
default_table_strategy = { type = "none" }
"#
        .parse()
        .unwrap();
        assert_eq!(config.default_table_strategy, Some(StrategyConfig::None));
    }

    #[test]
    fn test_error_line() {
        let err = r#"
data_sources = ["ds_0"]
default_data_source = = "ds_0"
"#
        .parse::<Config>()
        .unwrap_err();
        assert!(matches!(err, Error::Syntax(_, 3)), "{:?}", err);
    }

    #[test]
    fn test_load_and_swap() {
        let path = std::env::temp_dir().join(format!("shardroute-{}.toml", std::process::id()));
        std::fs::write(&path, RULES_TOML).unwrap();

        let loaded = load(&path).unwrap();
        assert!(loaded.is_sharding_table("t_order"));
        assert!(rules().is_broadcast_table("t_config"));

        std::fs::remove_file(&path).unwrap();
    }
}
