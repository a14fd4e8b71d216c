//! SingleHash stage - signs each item with two rate-limited digests.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{PipelineError, Stage, forward, spawn_each};
use crate::{
  actor::message::{Item, Token},
  digest::RateLimited,
};

/// SingleHash stage - emits `limited(item) ~ limited(unlimited(item))`.
///
/// Every item gets its own task, so successive items overlap. Both limited
/// legs of one item run concurrently too; they still go through the limiter's
/// single rate-limit slot one at a time.
pub struct SingleHashStage {
  service: RateLimited,
}

impl SingleHashStage {
  pub fn new(service: RateLimited) -> Self {
    Self { service }
  }
}

#[async_trait::async_trait]
impl Stage for SingleHashStage {
  type Input = Item;
  type Output = Token;

  fn name(&self) -> &'static str {
    "single_hash"
  }

  async fn run(
    &self,
    mut input: mpsc::Receiver<Item>,
    output: mpsc::Sender<Token>,
    cancel: CancellationToken,
  ) -> Result<(), PipelineError> {
    let processed = spawn_each(self.name(), &mut input, &cancel, |item| {
      let service = self.service.clone();
      let output = output.clone();
      let cancel = cancel.clone();
      async move {
        let token = sign_item(&service, item).await?;
        trace!(item, digest = %token.digest, "SingleHash result");
        if !forward(&output, token, &cancel).await? {
          trace!(item, "SingleHash: downstream closed");
        }
        Ok(())
      }
    })
    .await?;

    debug!(processed, "SingleHash stage complete");
    Ok(())
  }
}

/// Compute the token for one item.
pub async fn sign_item(service: &RateLimited, item: Item) -> Result<Token, PipelineError> {
  let data = item.to_string();

  let direct = service.limited_digest(&data);
  let transformed = async {
    let inner = service.unlimited_digest(&data).await?;
    trace!(item, unlimited = %inner, "SingleHash unlimited leg");
    service.limited_digest(&inner).await
  };
  let (direct, transformed) = tokio::try_join!(direct, transformed)?;

  Ok(Token::new(item, &direct, &transformed))
}
