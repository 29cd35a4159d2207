//! shardroute, sharding router and SQL rewriter.

use clap::Parser;
use shardroute::cli::{self, Cli, Commands};
use shardroute::{config, logger};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    logger();

    info!("shardroute {}", env!("CARGO_PKG_VERSION"));

    config::load(&args.config)?;

    match args.command {
        Some(Commands::Route { statement, params }) => cli::route(statement, params)?,
        Some(Commands::Check) | None => cli::check()?,
    }

    Ok(())
}
