#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use shardroute::config::Config;
use shardroute::planner::Planner;
use shardroute::rule::ShardingRule;
use shardroute::statement::{ColumnSegment, TableSegment};

pub fn rule() -> ShardingRule {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/sharding.toml");
    let config = Config::load(&path).unwrap();
    ShardingRule::new(&config).unwrap()
}

pub fn planner() -> Planner {
    shardroute::logger();
    Planner::new(Arc::new(rule()))
}

/// Character position of the `nth` occurrence of a whole word.
pub fn position(sql: &str, word: &str, nth: usize) -> usize {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';

    sql.match_indices(word)
        .filter(|(offset, _)| {
            let before = sql[..*offset].chars().next_back();
            let after = sql[offset + word.len()..].chars().next();
            !before.map(is_word).unwrap_or(false) && !after.map(is_word).unwrap_or(false)
        })
        .map(|(offset, _)| sql[..offset].chars().count())
        .nth(nth)
        .unwrap_or_else(|| panic!("\"{}\" #{} not in \"{}\"", word, nth, sql))
}

pub fn table(sql: &str, name: &str) -> TableSegment {
    TableSegment::new(position(sql, name, 0), name)
}

/// `owner.column` where `owner` is the `nth` whole-word occurrence.
pub fn qualified(sql: &str, owner: &str, nth: usize, column: &str) -> ColumnSegment {
    ColumnSegment::qualified(position(sql, owner, nth), owner, column)
}
