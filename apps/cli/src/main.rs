//! Listscribe CLI — AI content enrichment for organization directories.
//!
//! Crawls each organization's website and generates marketing text
//! (descriptions or excerpts) for every record in a dataset.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
