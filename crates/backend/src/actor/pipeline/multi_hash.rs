//! MultiHash stage - fans each token out into six rate-limited digests.

use tokio::{sync::mpsc, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{PipelineError, Stage, flatten, forward, spawn_each};
use crate::{actor::message::Token, digest::RateLimited};

/// Number of sub-digests per token
pub const FANOUT: usize = 6;

/// MultiHash stage - one result per token, built from [`FANOUT`] parallel
/// sub-digests.
///
/// Tokens never wait on each other: each one starts its fan-out as soon as it
/// is received. The limiter's single slot is the only throttle.
pub struct MultiHashStage {
  service: RateLimited,
}

impl MultiHashStage {
  pub fn new(service: RateLimited) -> Self {
    Self { service }
  }
}

#[async_trait::async_trait]
impl Stage for MultiHashStage {
  type Input = Token;
  type Output = String;

  fn name(&self) -> &'static str {
    "multi_hash"
  }

  async fn run(
    &self,
    mut input: mpsc::Receiver<Token>,
    output: mpsc::Sender<String>,
    cancel: CancellationToken,
  ) -> Result<(), PipelineError> {
    let name = self.name();
    let processed = spawn_each(name, &mut input, &cancel, |token| {
      let service = self.service.clone();
      let output = output.clone();
      let cancel = cancel.clone();
      async move {
        let result = fan_out(name, service, &token).await?;
        trace!(origin = token.origin, result = %result, "MultiHash result");
        if !forward(&output, result, &cancel).await? {
          trace!(origin = token.origin, "MultiHash: downstream closed");
        }
        Ok(())
      }
    })
    .await?;

    debug!(processed, "MultiHash stage complete");
    Ok(())
  }
}

/// Digest `"{slot}{token}"` for every slot concurrently and concatenate the
/// results in slot order.
///
/// Sub-digests may finish in any order; each one is written to its own slot
/// and the concatenation happens only after all of them completed.
pub async fn fan_out(stage: &'static str, service: RateLimited, token: &Token) -> Result<String, PipelineError> {
  let mut parts = JoinSet::new();
  for slot in 0..FANOUT {
    let service = service.clone();
    let data = format!("{slot}{}", token.digest);
    parts.spawn(async move {
      let digest = service.limited_digest(&data).await?;
      Ok::<_, PipelineError>((slot, digest))
    });
  }

  let mut slots: [String; FANOUT] = Default::default();
  while let Some(joined) = parts.join_next().await {
    let (slot, digest) = flatten(stage, joined)?;
    trace!(origin = token.origin, slot, "MultiHash slot filled");
    slots[slot] = digest;
  }

  Ok(slots.concat())
}
