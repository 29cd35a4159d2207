//! Routing hints supplied out of band.
//!
//! Either set by the caller or written in a comment:
//!
//! ```sql
//! /* SHARDING_HINT: t_order.SHARDING_DATABASE_VALUE=1, SHARDING_TABLE_VALUE=2 */
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::sharding::Value;

static HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*\s*SHARDING_HINT:(.*?)\*/").unwrap());

#[derive(Debug, Clone, PartialEq)]
struct HintValue {
    /// Applies to every table when not set.
    table: Option<String>,
    value: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hint {
    data_source: Option<String>,
    database_values: Vec<HintValue>,
    table_values: Vec<HintValue>,
    skip_rewrite: bool,
}

impl Hint {
    /// Send the statement to this data source only.
    pub fn data_source(mut self, name: &str) -> Self {
        self.data_source = Some(name.to_string());
        self
    }

    pub fn database_value(mut self, table: Option<&str>, value: impl Into<Value>) -> Self {
        self.database_values.push(HintValue {
            table: table.map(|t| t.to_lowercase()),
            value: value.into(),
        });
        self
    }

    pub fn table_value(mut self, table: Option<&str>, value: impl Into<Value>) -> Self {
        self.table_values.push(HintValue {
            table: table.map(|t| t.to_lowercase()),
            value: value.into(),
        });
        self
    }

    /// Execute the original SQL unchanged.
    pub fn skip_rewrite(mut self, skip: bool) -> Self {
        self.skip_rewrite = skip;
        self
    }

    pub fn pinned_data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    pub fn skips_rewrite(&self) -> bool {
        self.skip_rewrite
    }

    /// Database sharding values for a table.
    pub fn database_values(&self, table: &str) -> Vec<Value> {
        Self::values(&self.database_values, table)
    }

    /// Table sharding values for a table.
    pub fn table_values(&self, table: &str) -> Vec<Value> {
        Self::values(&self.table_values, table)
    }

    fn values(values: &[HintValue], table: &str) -> Vec<Value> {
        values
            .iter()
            .filter(|value| {
                value
                    .table
                    .as_ref()
                    .map(|t| t.eq_ignore_ascii_case(table))
                    .unwrap_or(true)
            })
            .map(|value| value.value.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Combine two hints. Values from both are kept; `other` wins the data source.
    pub fn merge(mut self, other: Hint) -> Self {
        if other.data_source.is_some() {
            self.data_source = other.data_source;
        }
        self.database_values.extend(other.database_values);
        self.table_values.extend(other.table_values);
        self.skip_rewrite |= other.skip_rewrite;
        self
    }
}

/// Extract a hint from a `SHARDING_HINT` comment.
pub fn parse_comment(sql: &str) -> Option<Hint> {
    let body = HINT.captures(sql)?.get(1)?.as_str();
    let mut hint = Hint::default();

    for item in body.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        let Some((key, value)) = item.split_once('=') else {
            warn!("malformed sharding hint \"{}\"", item);
            continue;
        };

        let (table, key) = match key.trim().rsplit_once('.') {
            Some((table, key)) => (Some(table.trim()), key.trim()),
            None => (None, key.trim()),
        };
        let value = value.trim().trim_matches('\'').trim_matches('"');

        match key.to_uppercase().as_str() {
            "SHARDING_DATABASE_VALUE" => hint = hint.database_value(table, parse_value(value)),
            "SHARDING_TABLE_VALUE" => hint = hint.table_value(table, parse_value(value)),
            "DATASOURCE_NAME" => hint = hint.data_source(value),
            "SKIP_SQL_REWRITE" => hint = hint.skip_rewrite(value.eq_ignore_ascii_case("true")),
            other => warn!("unknown sharding hint \"{}\"", other),
        }
    }

    Some(hint)
}

fn parse_value(value: &str) -> Value {
    match value.parse::<i64>() {
        Ok(int) => Value::Integer(int),
        Err(_) => Value::String(value.to_string()),
    }
}
