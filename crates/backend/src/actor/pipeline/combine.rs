//! Combine stage - joins every result into a single report.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{PipelineError, Stage, forward, next};

/// Combine stage - waits for the whole result stream, then emits one report.
///
/// Emits nothing when no results arrived.
pub struct CombineStage;

#[async_trait::async_trait]
impl Stage for CombineStage {
  type Input = String;
  type Output = String;

  fn name(&self) -> &'static str {
    "combine"
  }

  async fn run(
    &self,
    mut input: mpsc::Receiver<String>,
    output: mpsc::Sender<String>,
    cancel: CancellationToken,
  ) -> Result<(), PipelineError> {
    let mut results = Vec::new();
    while let Some(result) = next(&mut input, &cancel).await? {
      results.push(result);
    }

    let count = results.len();
    match combine_results(results) {
      Some(report) => {
        debug!(count, len = report.len(), "Combine stage emitting report");
        forward(&output, report, &cancel).await?;
      }
      None => debug!("Combine stage received no results"),
    }
    Ok(())
  }
}

/// Sort results ascending and join them with `_`.
pub fn combine_results(mut results: Vec<String>) -> Option<String> {
  if results.is_empty() {
    return None;
  }
  results.sort_unstable();
  Some(results.join("_"))
}
