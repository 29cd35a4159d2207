//! Positions of names in the SQL text.
//!
//! `start` and `stop` are character positions, both inclusive.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuoteCharacter {
    #[default]
    None,
    /// `"name"`
    Quote,
    /// `` `name` ``
    BackQuote,
    /// `[name]`
    Bracket,
}

impl QuoteCharacter {
    pub fn wrap(&self, value: &str) -> String {
        match self {
            Self::None => value.to_string(),
            Self::Quote => format!("\"{}\"", value),
            Self::BackQuote => format!("`{}`", value),
            Self::Bracket => format!("[{}]", value),
        }
    }
}

/// A name and where it is, quotes included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierSegment {
    pub start: usize,
    pub stop: usize,
    pub value: String,
    #[serde(default)]
    pub quote: QuoteCharacter,
}

impl IdentifierSegment {
    pub fn new(start: usize, value: &str) -> Self {
        Self {
            start,
            stop: start + value.chars().count().saturating_sub(1),
            value: value.to_string(),
            quote: QuoteCharacter::None,
        }
    }
}

/// Qualifier before a column, e.g. `o` in `o.order_id`.
///
/// `stop` points at the last character of the name; the dot
/// follows immediately after it.
pub type OwnerSegment = IdentifierSegment;

/// Table in FROM, JOIN, UPDATE, INSERT INTO, etc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSegment {
    pub name: IdentifierSegment,
    #[serde(default)]
    pub alias: Option<String>,
}

impl TableSegment {
    pub fn new(start: usize, name: &str) -> Self {
        Self {
            name: IdentifierSegment::new(start, name),
            alias: None,
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Does the qualifier refer to this table?
    pub fn is_referenced_by(&self, owner: &str) -> bool {
        match self.alias {
            Some(ref alias) => alias.eq_ignore_ascii_case(owner),
            None => self.name.value.eq_ignore_ascii_case(owner),
        }
    }
}

/// Column reference anywhere in the statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSegment {
    pub name: String,
    #[serde(default)]
    pub owner: Option<OwnerSegment>,
}

impl ColumnSegment {
    /// `owner.name` with the owner starting at `start`.
    pub fn qualified(start: usize, owner: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            owner: Some(OwnerSegment::new(start, owner)),
        }
    }
}

/// Index or constraint name in DDL, e.g. `CREATE INDEX idx_status ON t_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSegment {
    pub name: IdentifierSegment,
    /// Logical table the index belongs to, if the binder knows it.
    #[serde(default)]
    pub table: Option<String>,
}

pub type ConstraintSegment = IndexSegment;
