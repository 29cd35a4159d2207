//! Logical table and its physical layout.

use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{DataNode, Error, ShardingStrategy};
use crate::keygen::KeyGenerator;

/// Key column filled in by a generator when an INSERT omits it.
#[derive(Debug, Clone)]
pub struct KeyGenerate {
    pub column: String,
    pub generator: Arc<dyn KeyGenerator>,
}

#[derive(Debug, Clone)]
pub struct TableRule {
    logic_table: String,
    data_nodes: Vec<DataNode>,
    /// Actual tables on each data source, both in routing order.
    tables: IndexMap<String, Vec<String>>,
    database_strategy: ShardingStrategy,
    table_strategy: ShardingStrategy,
    key_generate: Option<KeyGenerate>,
}

impl TableRule {
    /// Create table rule.
    ///
    /// Data sources follow the order they are declared in `data_sources`;
    /// actual tables follow the order of `data_nodes`.
    pub fn new(
        logic_table: &str,
        data_nodes: Vec<DataNode>,
        data_sources: &[String],
        database_strategy: ShardingStrategy,
        table_strategy: ShardingStrategy,
        key_generate: Option<KeyGenerate>,
    ) -> Result<Self, Error> {
        if data_nodes.is_empty() {
            return Err(Error::NoDataNodes(logic_table.to_string()));
        }

        for node in &data_nodes {
            if !data_sources.contains(&node.data_source) {
                return Err(Error::UnknownDataSource {
                    table: logic_table.to_string(),
                    data_source: node.data_source.clone(),
                });
            }
        }

        let mut tables = IndexMap::new();
        for data_source in data_sources {
            let actual = data_nodes
                .iter()
                .filter(|node| &node.data_source == data_source)
                .map(|node| node.table.clone())
                .fold(vec![], |mut acc: Vec<String>, table| {
                    if !acc.contains(&table) {
                        acc.push(table);
                    }
                    acc
                });
            if !actual.is_empty() {
                tables.insert(data_source.clone(), actual);
            }
        }

        let data_nodes = tables
            .iter()
            .flat_map(|(data_source, tables)| {
                tables
                    .iter()
                    .map(move |table| DataNode::new(data_source, table))
            })
            .collect();

        Ok(Self {
            logic_table: logic_table.to_lowercase(),
            data_nodes,
            tables,
            database_strategy,
            table_strategy,
            key_generate,
        })
    }

    pub fn logic_table(&self) -> &str {
        &self.logic_table
    }

    /// All data nodes, in routing order.
    pub fn data_nodes(&self) -> &[DataNode] {
        &self.data_nodes
    }

    /// Data sources holding this table, in routing order.
    pub fn data_sources(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Actual tables on a data source.
    pub fn tables(&self, data_source: &str) -> &[String] {
        self.tables
            .get(data_source)
            .map(|tables| tables.as_slice())
            .unwrap_or(&[])
    }

    /// Data source and table positions of a data node.
    pub fn position(&self, node: &DataNode) -> Option<(usize, usize)> {
        let (data_source, _, tables) = self.tables.get_full(&node.data_source)?;
        let table = tables.iter().position(|table| table == &node.table)?;
        Some((data_source, table))
    }

    /// Data node at the given positions.
    pub fn node_at(&self, data_source: usize, table: usize) -> Option<DataNode> {
        let (name, tables) = self.tables.get_index(data_source)?;
        tables.get(table).map(|table| DataNode::new(name, table))
    }

    pub fn contains(&self, node: &DataNode) -> bool {
        self.position(node).is_some()
    }

    pub fn database_strategy(&self) -> &ShardingStrategy {
        &self.database_strategy
    }

    pub fn table_strategy(&self) -> &ShardingStrategy {
        &self.table_strategy
    }

    pub fn key_generate(&self) -> Option<&KeyGenerate> {
        self.key_generate.as_ref()
    }

    /// Columns read by either strategy.
    pub fn sharding_columns(&self) -> Vec<&str> {
        let mut columns = vec![];
        for column in [self.database_strategy.column(), self.table_strategy.column()]
            .into_iter()
            .flatten()
        {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }

    /// Actual table names on any data source.
    pub fn actual_tables(&self) -> impl Iterator<Item = &String> {
        self.data_nodes.iter().map(|node| &node.table)
    }
}
