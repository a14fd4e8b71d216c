//! Streaming Pipeline for Item Signing
//!
//! A chain of stages connected by bounded channels:
//!
//! ```text
//! source → SingleHash → MultiHash → Combine
//!   Item      Token       String     Report
//! ```
//!
//! Each stage runs as its own task, consumes its input channel until it is
//! closed, then returns and drops its output sender. That closes the next
//! channel, so end-of-stream travels strictly in pipeline order.
//!
//! ## Failure
//!
//! The first stage that fails (error or panic) cancels the run's
//! `CancellationToken`. Every stage selects on that token, so siblings unwind
//! instead of waiting on channels that will never close. The caller gets the
//! first error and no partial output.

mod combine;
mod multi_hash;
mod single_hash;

use std::{future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::{
  sync::mpsc,
  task::{JoinError, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

pub use self::{
  combine::{CombineStage, combine_results},
  multi_hash::{FANOUT, MultiHashStage, fan_out},
  single_hash::{SingleHashStage, sign_item},
};
use crate::{
  actor::message::Item,
  digest::{DigestError, DigestService, RateLimited},
  domain::config::PipelineConfig,
};

// ============================================================================
// Stage
// ============================================================================

/// One unit of the pipeline.
///
/// `run` consumes `input` until it is closed and returns; the runner drops
/// `output` afterwards, which closes the downstream channel.
#[async_trait::async_trait]
pub trait Stage: Send + Sync + 'static {
  type Input: Send + 'static;
  type Output: Send + 'static;

  fn name(&self) -> &'static str;

  async fn run(
    &self,
    input: mpsc::Receiver<Self::Input>,
    output: mpsc::Sender<Self::Output>,
    cancel: CancellationToken,
  ) -> Result<(), PipelineError>;
}

// ============================================================================
// Runner
// ============================================================================

type StageOutcome = (&'static str, Result<(), PipelineError>);

/// Wires stages into a chain and waits for the whole chain to drain.
///
/// The type parameter is the message type of the current tail channel, so
/// `stage` only accepts a stage whose input matches the previous output.
pub struct PipelineRunner<T> {
  tail: mpsc::Receiver<T>,
  stages: JoinSet<StageOutcome>,
  buffer: usize,
  cancel: CancellationToken,
}

impl<T: Send + 'static> PipelineRunner<T> {
  /// Start a pipeline reading from an externally fed channel.
  pub fn new(input: mpsc::Receiver<T>, buffer: usize, cancel: CancellationToken) -> Self {
    Self {
      tail: input,
      stages: JoinSet::new(),
      buffer: buffer.max(1),
      cancel,
    }
  }

  /// Start a pipeline fed from an in-memory sequence.
  ///
  /// The feeder runs as a source task owned by the runner and closes the
  /// first channel once the sequence is exhausted.
  pub fn from_items<I>(items: I, buffer: usize, cancel: CancellationToken) -> Self
  where
    I: IntoIterator<Item = T> + Send + 'static,
    I::IntoIter: Send,
  {
    let buffer = buffer.max(1);
    let (tx, rx) = mpsc::channel(buffer);
    let mut runner = Self::new(rx, buffer, cancel);

    let source_cancel = runner.cancel.clone();
    runner.stages.spawn(async move {
      let mut sent = 0usize;
      for item in items {
        match forward(&tx, item, &source_cancel).await {
          Ok(true) => sent += 1,
          Ok(false) => {
            trace!(sent, "Source: downstream closed");
            break;
          }
          Err(e) => return ("source", Err(e)),
        }
      }
      trace!(sent, "Source exhausted");
      ("source", Ok(()))
    });

    runner
  }

  /// Append a stage. Its task starts immediately.
  pub fn stage<S>(self, stage: S) -> PipelineRunner<S::Output>
  where
    S: Stage<Input = T>,
  {
    let Self {
      tail: input,
      mut stages,
      buffer,
      cancel,
    } = self;
    let (tx, rx) = mpsc::channel(buffer);
    let stage_cancel = cancel.clone();
    let name = stage.name();

    stages.spawn(async move {
      debug!(stage = name, "Stage starting");
      let result = match AssertUnwindSafe(stage.run(input, tx, stage_cancel)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(PipelineError::StagePanicked {
          stage: name.to_string(),
          message: panic_message(panic.as_ref()),
        }),
      };
      debug!(stage = name, ok = result.is_ok(), "Stage finished");
      (name, result)
    });

    PipelineRunner {
      tail: rx,
      stages,
      buffer,
      cancel,
    }
  }

  /// Drain the last channel and wait for every stage to exit.
  ///
  /// Returns everything the last stage emitted, or the first stage failure.
  pub async fn finish(self) -> Result<Vec<T>, PipelineError> {
    let Self {
      mut tail,
      mut stages,
      cancel,
      ..
    } = self;

    let mut outputs = Vec::new();
    let mut first_error: Option<PipelineError> = None;
    let mut draining = true;

    while draining || !stages.is_empty() {
      tokio::select! {
        msg = tail.recv(), if draining => match msg {
          Some(value) => outputs.push(value),
          None => draining = false,
        },
        Some(joined) = stages.join_next(), if !stages.is_empty() => {
          let (name, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => ("unknown", Err(join_error("unknown", e))),
          };
          if let Err(e) = result {
            if first_error.is_none() {
              warn!(stage = name, error = %e, "Stage failed, cancelling pipeline");
              cancel.cancel();
              first_error = Some(e);
            } else {
              debug!(stage = name, error = %e, "Stage unwound after earlier failure");
            }
          }
        }
      }
    }

    match first_error {
      Some(e) => Err(e),
      None => Ok(outputs),
    }
  }
}

// ============================================================================
// Signer pipeline
// ============================================================================

/// Run the signing pipeline over `items`.
///
/// Every limited call made by any stage goes through the process-wide
/// rate-limit slot. Returns the combined report, or `None` when no items were
/// supplied.
pub async fn run_signer_pipeline(
  items: Vec<Item>,
  service: Arc<dyn DigestService>,
  config: &PipelineConfig,
  cancel: CancellationToken,
) -> Result<Option<String>, PipelineError> {
  let item_count = items.len();
  let service = RateLimited::process_wide(service);
  debug!(item_count, provider = service.name(), "Starting signer pipeline");

  let reports = PipelineRunner::from_items(items, config.channel_buffer, cancel.child_token())
    .stage(SingleHashStage::new(service.clone()))
    .stage(MultiHashStage::new(service))
    .stage(CombineStage)
    .finish()
    .await?;

  debug!(item_count, reports = reports.len(), "Signer pipeline complete");
  Ok(reports.into_iter().next())
}

// ============================================================================
// Stage helpers
// ============================================================================

/// Send `value` downstream unless the run is cancelled.
///
/// `Ok(false)` means the receiver is gone; callers stop producing.
pub(crate) async fn forward<T>(
  tx: &mpsc::Sender<T>,
  value: T,
  cancel: &CancellationToken,
) -> Result<bool, PipelineError> {
  tokio::select! {
    biased;
    _ = cancel.cancelled() => Err(PipelineError::Cancelled),
    result = tx.send(value) => Ok(result.is_ok()),
  }
}

/// Receive the next input unless the run is cancelled.
pub(crate) async fn next<T>(
  rx: &mut mpsc::Receiver<T>,
  cancel: &CancellationToken,
) -> Result<Option<T>, PipelineError> {
  tokio::select! {
    biased;
    _ = cancel.cancelled() => Err(PipelineError::Cancelled),
    msg = rx.recv() => Ok(msg),
  }
}

/// Spawn one task per input message, reaping finished tasks as they arrive.
///
/// Returns once the input is closed and every task has completed. Any task
/// failure is returned immediately; dropping the `JoinSet` aborts the rest.
pub(crate) async fn spawn_each<I, F, Fut>(
  stage: &'static str,
  input: &mut mpsc::Receiver<I>,
  cancel: &CancellationToken,
  mut task: F,
) -> Result<usize, PipelineError>
where
  F: FnMut(I) -> Fut,
  Fut: Future<Output = Result<(), PipelineError>> + Send + 'static,
{
  let mut in_flight = JoinSet::new();
  let mut completed = 0usize;
  let mut open = true;

  while open || !in_flight.is_empty() {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
      Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
        flatten(stage, joined)?;
        completed += 1;
      }
      msg = input.recv(), if open => match msg {
        Some(value) => {
          in_flight.spawn(task(value));
        }
        None => {
          trace!(stage, in_flight = in_flight.len(), "Input closed, draining in-flight tasks");
          open = false;
        }
      },
    }
  }

  Ok(completed)
}

/// Flatten a joined task result into the stage's error type.
pub(crate) fn flatten<T>(
  stage: &'static str,
  joined: Result<Result<T, PipelineError>, JoinError>,
) -> Result<T, PipelineError> {
  joined.map_err(|e| join_error(stage, e))?
}

fn join_error(stage: &str, e: JoinError) -> PipelineError {
  if e.is_cancelled() {
    PipelineError::Cancelled
  } else {
    PipelineError::StagePanicked {
      stage: stage.to_string(),
      message: e.to_string(),
    }
  }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
  #[error("Digest error: {0}")]
  Digest(#[from] DigestError),
  #[error("Stage {stage} panicked: {message}")]
  StagePanicked { stage: String, message: String },
  #[error("Pipeline cancelled")]
  Cancelled,
}
