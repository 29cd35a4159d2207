//! SQL rewriting.
//!
//! Each route unit gets its own copy of the statement: logical names
//! replaced by actual ones and whatever the merger needs added. Text
//! outside of tokens is copied unchanged.

pub mod error;
pub mod generator;
pub mod token;

pub use error::Error;
pub use generator::{Generated, TokenGenerator};
pub use token::{InsertValuesRow, SqlToken, TokenKind};

use std::collections::BTreeSet;

use tracing::trace;

use crate::condition::ShardingConditions;
use crate::pagination::PaginationContext;
use crate::route::{RouteContext, RouteUnit};
use crate::rule::ShardingRule;
use crate::sharding::Value;
use crate::statement::StatementContext;

/// Statement and parameters for one route unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteUnit {
    pub sql: String,
    pub parameters: Vec<Value>,
}

/// Render the statement for a route unit.
pub fn render(sql: &str, tokens: &[SqlToken], unit: &RouteUnit) -> Result<String, Error> {
    // Byte offset of each character, and of the end.
    let offsets = sql
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(sql.len()))
        .collect::<Vec<_>>();
    let length = offsets.len() - 1;

    let mut tokens = tokens.iter().collect::<Vec<_>>();
    tokens.sort_by_key(|token| (token.start, token.stop));

    let mut result = String::with_capacity(sql.len());
    let mut cursor = 0;

    for token in tokens {
        if token.start > length || token.stop > length {
            return Err(Error::OutOfBounds {
                position: token.start.max(token.stop),
                length,
            });
        }
        if token.start < cursor {
            return Err(Error::Overlap(token.start));
        }

        result.push_str(&sql[offsets[cursor]..offsets[token.start]]);
        result.push_str(&token.kind.render(unit)?);
        cursor = token.stop;
    }

    result.push_str(&sql[offsets[cursor]..]);

    Ok(result)
}

pub struct RewriteEngine<'a> {
    rule: &'a ShardingRule,
    stmt: &'a StatementContext,
    route: &'a RouteContext,
    conditions: &'a ShardingConditions,
    params: &'a [Value],
}

impl<'a> RewriteEngine<'a> {
    pub fn new(
        rule: &'a ShardingRule,
        stmt: &'a StatementContext,
        route: &'a RouteContext,
        conditions: &'a ShardingConditions,
        params: &'a [Value],
    ) -> Self {
        Self {
            rule,
            stmt,
            route,
            conditions,
            params,
        }
    }

    /// Rewrite the statement for every route unit, in route order.
    pub fn rewrite(&self) -> Result<Vec<RewriteUnit>, Error> {
        let pagination = PaginationContext::new(
            self.stmt
                .select
                .as_ref()
                .and_then(|select| select.pagination.as_ref()),
            self.params,
        );

        let generated = TokenGenerator::new(
            self.rule,
            self.stmt,
            self.route,
            self.conditions,
            &pagination,
        )
        .generate()?;

        let positional = self.stmt.uses_dollar_markers();
        let mut units = vec![];

        for unit in self.route.units() {
            let sql = render(&self.stmt.sql, &generated.tokens, unit)?;
            let parameters = self.parameters(&generated, unit, positional);
            trace!("{} => {}", unit, sql);
            units.push(RewriteUnit { sql, parameters });
        }

        Ok(units)
    }

    /// Parameters for a unit.
    ///
    /// `$n` markers name their parameter, so none can be dropped
    /// without renumbering the text. Only values are revised then.
    fn parameters(&self, generated: &Generated, unit: &RouteUnit, positional: bool) -> Vec<Value> {
        let mut removed = BTreeSet::new();
        if !positional {
            removed.extend(generated.removed_parameters.iter().copied());
            for token in &generated.tokens {
                removed.extend(token.kind.excluded_parameters(unit));
            }
        }

        self.params
            .iter()
            .enumerate()
            .filter(|(index, _)| !removed.contains(index))
            .map(|(index, value)| {
                generated
                    .revised_parameters
                    .iter()
                    .find(|(revised, _)| *revised == index)
                    .map(|(_, value)| value.clone())
                    .unwrap_or_else(|| value.clone())
            })
            .collect()
    }
}
