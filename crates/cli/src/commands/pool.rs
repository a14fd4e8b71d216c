//! Pool command - interactive worker pool driven from stdin

use anyhow::{Context, Result};
use hashpipe::{WorkerPool, config::Config};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Start the worker pool and apply commands read line by line from stdin.
///
/// `add` and `remove` resize the pool, `size` prints the worker count and
/// `quit` (or EOF, or Ctrl-C) shuts it down.
pub async fn cmd_pool(config: &Config, workers: Option<usize>) -> Result<()> {
  let mut pool_config = config.pool.clone();
  if let Some(workers) = workers {
    pool_config.initial_workers = workers;
  }

  let cancel = CancellationToken::new();
  let handle = WorkerPool::spawn(pool_config, cancel.clone());
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => {
        info!("Interrupted");
        break;
      }

      line = lines.next_line() => {
        let Some(line) = line.context("Failed to read stdin")? else {
          break;
        };
        match line.trim() {
          "quit" | "exit" => break,
          "size" => println!("{}", handle.size().await.context("Pool stopped")?),
          cmd => handle.command(cmd).await.context("Pool stopped")?,
        }
      }
    }
  }

  handle.shutdown().await.ok();
  // Wait for the supervisor to release its queue.
  handle.closed().await;
  cancel.cancel();
  Ok(())
}
