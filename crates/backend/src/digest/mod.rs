mod rate_limit;
mod signer;

use std::sync::Arc;

pub use rate_limit::RateLimited;
pub use signer::SignerService;

use crate::domain::config::SignerConfig;

/// A pair of string digest operations with different concurrency contracts.
///
/// `unlimited_digest` may be called with any amount of concurrency.
/// `limited_digest` models an externally rate-limited operation: callers must
/// never have more than one call outstanding. The pipeline enforces that by
/// wrapping every service it is given in [`RateLimited`].
#[async_trait::async_trait]
pub trait DigestService: Send + Sync {
  fn name(&self) -> &str;

  async fn limited_digest(&self, data: &str) -> Result<String, DigestError>;
  async fn unlimited_digest(&self, data: &str) -> Result<String, DigestError>;
}

impl dyn DigestService {
  /// Default provider (crc32 / md5) with the configured latencies.
  pub fn from_config(config: &SignerConfig) -> Arc<dyn DigestService> {
    Arc::new(SignerService::new(config.limited_latency(), config.unlimited_latency()))
  }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DigestError {
  #[error("Rate limit slot closed")]
  SlotClosed,
  #[error("Digest provider error: {0}")]
  Provider(String),
}
