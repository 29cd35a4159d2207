use std::fs::read_to_string;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config;
use crate::planner::Planner;
use crate::sharding::Value;
use crate::statement::StatementContext;

/// shardroute routes and rewrites SQL statements
/// against a set of sharding rules.
#[derive(Parser, Debug)]
pub struct Cli {
    /// Path to the sharding rules. Default: "sharding.toml"
    #[arg(short, long, default_value = "sharding.toml")]
    pub config: PathBuf,
    /// Subcommand.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the sharding rules and print a summary.
    Check,

    /// Route a statement and print the SQL for each data source.
    Route {
        /// Statement context as JSON, produced by the parser.
        #[arg(short, long)]
        statement: PathBuf,
        /// Bound parameters as a JSON array.
        #[arg(short, long)]
        params: Option<String>,
    },
}

/// Print what the loaded rules contain.
pub fn check() -> Result<(), Box<dyn std::error::Error>> {
    let rules = config::rules();

    for table in rules.tables() {
        println!(
            "{}: {} data nodes, sharded by [{}]",
            table.logic_table(),
            table.data_nodes().len(),
            table.sharding_columns().join(", ")
        );
    }

    for group in rules.binding_groups() {
        println!("binding: {}", group.tables().join(", "));
    }

    if !rules.broadcast_tables().is_empty() {
        println!("broadcast: {}", rules.broadcast_tables().join(", "));
    }

    Ok(())
}

/// Plan a statement and print the result as JSON.
pub fn route(statement: PathBuf, params: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let stmt: StatementContext = serde_json::from_str(&read_to_string(statement)?)?;
    let params: Vec<Value> = match params {
        Some(params) => serde_json::from_str(&params)?,
        None => vec![],
    };

    let plan = Planner::from_config().plan(&stmt, &params, None)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);

    Ok(())
}
