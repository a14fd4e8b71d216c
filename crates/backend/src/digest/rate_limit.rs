// Single-slot rate limiter for the limited digest operation
//
// The limited operation must never have more than one call in flight. Every
// call acquires the only permit of a shared semaphore for the duration of the
// call and releases it immediately after, no matter how many logical tasks
// are waiting. Unlimited calls bypass the slot entirely.
//
// `RateLimited` is not itself a `DigestService`, so a limiter can never be
// wrapped in another one. Outside of tests every limiter shares the one
// static slot, so independent pipelines in the same process serialize
// against each other.

use std::sync::{Arc, LazyLock};

use tokio::sync::Semaphore;
use tracing::trace;

use super::{DigestError, DigestService};

static PROCESS_SLOT: LazyLock<Arc<Semaphore>> = LazyLock::new(|| Arc::new(Semaphore::new(1)));

/// A [`DigestService`] whose `limited_digest` is serialized through a single
/// permit. Cheap to clone; clones share the slot.
#[derive(Clone)]
pub struct RateLimited {
  inner: Arc<dyn DigestService>,
  slot: Arc<Semaphore>,
}

impl RateLimited {
  /// Limiter sharing the process-wide slot.
  pub fn process_wide(inner: Arc<dyn DigestService>) -> Self {
    Self {
      inner,
      slot: Arc::clone(&PROCESS_SLOT),
    }
  }

  /// Limiter with a private slot, isolated from the rest of the process.
  #[cfg(test)]
  pub(crate) fn isolated(inner: Arc<dyn DigestService>) -> Self {
    Self::with_slot(inner, Arc::new(Semaphore::new(1)))
  }

  #[cfg(test)]
  pub(crate) fn with_slot(inner: Arc<dyn DigestService>, slot: Arc<Semaphore>) -> Self {
    Self { inner, slot }
  }

  pub fn name(&self) -> &str {
    self.inner.name()
  }

  pub async fn limited_digest(&self, data: &str) -> Result<String, DigestError> {
    let _permit = self.slot.acquire().await.map_err(|_| DigestError::SlotClosed)?;
    trace!(provider = self.inner.name(), len = data.len(), "Rate limit slot acquired");
    self.inner.limited_digest(data).await
  }

  pub async fn unlimited_digest(&self, data: &str) -> Result<String, DigestError> {
    self.inner.unlimited_digest(data).await
  }
}
