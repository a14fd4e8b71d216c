//! Run command - sign a batch of items and print the report

use std::time::Instant;

use anyhow::{Context, Result, bail};
use hashpipe::{DigestService, Item, config::Config, run_signer_pipeline};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Serialize)]
struct RunOutput<'a> {
  items: &'a [Item],
  report: Option<&'a str>,
  elapsed_ms: u128,
}

/// Run the signing pipeline over `items`
///
/// Ctrl-C cancels the run.
pub async fn cmd_run(config: &Config, items: Vec<Item>, json: bool) -> Result<()> {
  if items.is_empty() {
    bail!("Empty input");
  }

  let service = <dyn DigestService>::from_config(&config.signer);
  let cancel = CancellationToken::new();

  let interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("Interrupted, cancelling pipeline");
      interrupt.cancel();
    }
  });

  let started = Instant::now();
  let report = run_signer_pipeline(items.clone(), service, &config.pipeline, cancel)
    .await
    .context("Pipeline failed")?;
  let elapsed = started.elapsed();
  info!(items = items.len(), elapsed_ms = elapsed.as_millis() as u64, "Pipeline finished");

  if json {
    let output = RunOutput {
      items: &items,
      report: report.as_deref(),
      elapsed_ms: elapsed.as_millis(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
  } else if let Some(report) = report {
    println!("{report}");
  }

  Ok(())
}
