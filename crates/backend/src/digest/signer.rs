//! Default digest provider: crc32 for the limited operation, md5 for the
//! unlimited one, each with a configurable artificial latency.

use std::time::Duration;

use md5::{Digest, Md5};

use super::{DigestError, DigestService};

#[derive(Debug, Clone, Default)]
pub struct SignerService {
  limited_latency: Duration,
  unlimited_latency: Duration,
}

impl SignerService {
  pub fn new(limited_latency: Duration, unlimited_latency: Duration) -> Self {
    Self {
      limited_latency,
      unlimited_latency,
    }
  }

  /// IEEE crc32 rendered as a decimal string
  pub fn crc32(data: &str) -> String {
    crc32fast::hash(data.as_bytes()).to_string()
  }

  /// md5 rendered as lowercase hex
  pub fn md5(data: &str) -> String {
    hex::encode(Md5::digest(data.as_bytes()))
  }
}

#[async_trait::async_trait]
impl DigestService for SignerService {
  fn name(&self) -> &str {
    "signer"
  }

  async fn limited_digest(&self, data: &str) -> Result<String, DigestError> {
    if !self.limited_latency.is_zero() {
      tokio::time::sleep(self.limited_latency).await;
    }
    Ok(Self::crc32(data))
  }

  async fn unlimited_digest(&self, data: &str) -> Result<String, DigestError> {
    if !self.unlimited_latency.is_zero() {
      tokio::time::sleep(self.unlimited_latency).await;
    }
    Ok(Self::md5(data))
  }
}
