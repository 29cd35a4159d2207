//! Routing result.

use std::fmt::Display;

use crate::rule::DataNode;

/// Logical name and the actual name it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteMapper {
    pub logic_name: String,
    pub actual_name: String,
}

impl RouteMapper {
    pub fn new(logic_name: &str, actual_name: &str) -> Self {
        Self {
            logic_name: logic_name.to_string(),
            actual_name: actual_name.to_string(),
        }
    }
}

/// One data source and the actual tables the statement uses there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteUnit {
    data_source: RouteMapper,
    table_mappers: Vec<RouteMapper>,
}

impl RouteUnit {
    pub fn new(data_source: &str, table_mappers: Vec<RouteMapper>) -> Self {
        Self {
            data_source: RouteMapper::new(data_source, data_source),
            table_mappers,
        }
    }

    pub fn data_source(&self) -> &str {
        &self.data_source.actual_name
    }

    pub fn table_mappers(&self) -> &[RouteMapper] {
        &self.table_mappers
    }

    /// Actual name of a logical table in this unit.
    pub fn actual_table(&self, logic_table: &str) -> Option<&str> {
        self.table_mappers
            .iter()
            .find(|mapper| mapper.logic_name.eq_ignore_ascii_case(logic_table))
            .map(|mapper| mapper.actual_name.as_str())
    }

    /// Data node of a logical table in this unit.
    pub fn data_node(&self, logic_table: &str) -> Option<DataNode> {
        self.actual_table(logic_table)
            .map(|table| DataNode::new(self.data_source(), table))
    }

    pub(super) fn push_mapper(&mut self, mapper: RouteMapper) {
        if !self.table_mappers.contains(&mapper) {
            self.table_mappers.push(mapper);
        }
    }
}

impl Display for RouteUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self
            .table_mappers
            .iter()
            .map(|mapper| format!("{} -> {}", mapper.logic_name, mapper.actual_name))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} [{}]", self.data_source(), tables)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteContext {
    units: Vec<RouteUnit>,
    /// Data nodes each sharding condition routed to, in condition order.
    original_data_nodes: Vec<Vec<DataNode>>,
}

impl RouteContext {
    pub fn new(units: Vec<RouteUnit>, original_data_nodes: Vec<Vec<DataNode>>) -> Self {
        Self {
            units,
            original_data_nodes,
        }
    }

    pub fn units(&self) -> &[RouteUnit] {
        &self.units
    }

    /// Statement runs on exactly one data node.
    pub fn is_single(&self) -> bool {
        self.units.len() == 1
    }

    pub fn original_data_nodes(&self) -> &[Vec<DataNode>] {
        &self.original_data_nodes
    }

    /// Conditions whose data nodes include the unit's node for `logic_table`.
    /// A condition without data nodes is on every node.
    pub fn conditions_on(&self, unit: &RouteUnit, logic_table: &str) -> Vec<usize> {
        let Some(node) = unit.data_node(logic_table) else {
            return vec![];
        };

        self.original_data_nodes
            .iter()
            .enumerate()
            .filter(|(_, nodes)| nodes.is_empty() || nodes.contains(&node))
            .map(|(condition, _)| condition)
            .collect()
    }

    /// Distinct data sources, in routing order.
    pub fn data_sources(&self) -> Vec<&str> {
        let mut data_sources = vec![];
        for unit in &self.units {
            if !data_sources.contains(&unit.data_source()) {
                data_sources.push(unit.data_source());
            }
        }
        data_sources
    }
}
