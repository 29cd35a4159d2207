//! Binding table groups.

use super::{Error, TableRule};

/// Tables sharded identically, so a join between them never
/// crosses data nodes. The first table is the primary.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BindingTableGroup {
    tables: Vec<String>,
}

impl BindingTableGroup {
    pub fn new(tables: Vec<String>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    pub fn primary(&self) -> &str {
        self.tables.first().map(|t| t.as_str()).unwrap_or_default()
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t.eq_ignore_ascii_case(table))
    }

    /// Check that a member has the same layout as the primary:
    /// same data sources and the same number of tables on each one.
    pub fn check(primary: &TableRule, member: &TableRule) -> Result<(), Error> {
        let layout = |rule: &TableRule| {
            rule.data_sources()
                .into_iter()
                .map(|ds| {
                    let count = rule.tables(&ds).len();
                    (ds, count)
                })
                .collect::<Vec<_>>()
        };

        if layout(primary) != layout(member) {
            return Err(Error::BindingLayout {
                primary: primary.logic_table().to_string(),
                table: member.logic_table().to_string(),
            });
        }

        Ok(())
    }
}
