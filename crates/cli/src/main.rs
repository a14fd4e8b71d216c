//! hashpipe CLI - staged signing pipeline and resizable worker pool

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

use commands::{cmd_pool, cmd_run, load_config};
use logging::init_logging;

#[derive(Parser)]
#[command(name = "hashpipe")]
#[command(about = "Concurrent signing pipeline and dynamic worker pool")]
#[command(after_help = "\
QUICK START:
  hashpipe run 7                  # Sign items 0..7 and print the report
  hashpipe run --items 0,1,1,2    # Sign explicit items
  hashpipe pool                   # Start the worker pool (type add/remove/size/quit)

CONFIG LOCATIONS:
  Local: ./hashpipe.toml
  User:  ~/.config/hashpipe/config.toml")]
struct Cli {
  /// Config file (default: ./hashpipe.toml, then user config)
  #[arg(short, long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the signing pipeline and print the combined report
  Run {
    /// Sign items 0..count
    #[arg(conflicts_with = "items")]
    count: Option<u64>,
    /// Comma-separated items to sign
    #[arg(long, value_delimiter = ',')]
    items: Option<Vec<u64>>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
  /// Start the worker pool and read commands from stdin
  Pool {
    /// Initial worker count (default: pool.initial_workers)
    #[arg(short, long)]
    workers: Option<usize>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let config = load_config(cli.config.as_deref())?;
  let _guard = init_logging(&config.logging);

  match cli.command {
    Commands::Run { count, items, json } => {
      let items = match (count, items) {
        (_, Some(items)) => items,
        (Some(count), None) => (0..count).collect(),
        (None, None) => Vec::new(),
      };
      cmd_run(&config, items, json).await
    }
    Commands::Pool { workers } => cmd_pool(&config, workers).await,
  }
}
