//! Test helpers for actor tests.
//!
//! Provides deterministic digest services and a small pool test context.
//! Every fake digest renders `limited(s)` as `L(s)` and `unlimited(s)` as
//! `U(s)`, so expected outputs can be written by hand.

use std::{
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
  actor::{PoolHandle, WorkerPool, worker::WorkerSink},
  digest::{DigestError, DigestService},
  domain::config::PoolConfig,
};

// ============================================================================
// Digest fakes
// ============================================================================

/// Instant, stateless fake.
pub struct StubDigest;

#[async_trait::async_trait]
impl DigestService for StubDigest {
  fn name(&self) -> &str {
    "stub"
  }

  async fn limited_digest(&self, data: &str) -> Result<String, DigestError> {
    Ok(format!("L({data})"))
  }

  async fn unlimited_digest(&self, data: &str) -> Result<String, DigestError> {
    Ok(format!("U({data})"))
  }
}

/// Snapshot of a [`CountingDigest`]'s counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestStats {
  pub limited_calls: usize,
  pub unlimited_calls: usize,
  pub max_concurrent_limited: usize,
  pub max_concurrent_unlimited: usize,
}

#[derive(Default)]
struct Counters {
  limited_calls: AtomicUsize,
  unlimited_calls: AtomicUsize,
  limited_in_flight: AtomicUsize,
  unlimited_in_flight: AtomicUsize,
  max_limited: AtomicUsize,
  max_unlimited: AtomicUsize,
}

/// Fake that records call counts and the peak number of overlapping calls.
///
/// Clones share their counters.
#[derive(Clone, Default)]
pub struct CountingDigest {
  delay: Duration,
  counters: Arc<Counters>,
}

impl CountingDigest {
  pub fn with_delay(delay: Duration) -> Self {
    Self {
      delay,
      counters: Arc::default(),
    }
  }

  pub fn stats(&self) -> DigestStats {
    let c = &self.counters;
    DigestStats {
      limited_calls: c.limited_calls.load(Ordering::SeqCst),
      unlimited_calls: c.unlimited_calls.load(Ordering::SeqCst),
      max_concurrent_limited: c.max_limited.load(Ordering::SeqCst),
      max_concurrent_unlimited: c.max_unlimited.load(Ordering::SeqCst),
    }
  }

  async fn tracked(&self, calls: &AtomicUsize, in_flight: &AtomicUsize, max: &AtomicUsize) {
    calls.fetch_add(1, Ordering::SeqCst);
    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    max.fetch_max(now, Ordering::SeqCst);
    if self.delay.is_zero() {
      tokio::task::yield_now().await;
    } else {
      tokio::time::sleep(self.delay).await;
    }
    in_flight.fetch_sub(1, Ordering::SeqCst);
  }
}

#[async_trait::async_trait]
impl DigestService for CountingDigest {
  fn name(&self) -> &str {
    "counting"
  }

  async fn limited_digest(&self, data: &str) -> Result<String, DigestError> {
    let c = &self.counters;
    self.tracked(&c.limited_calls, &c.limited_in_flight, &c.max_limited).await;
    Ok(format!("L({data})"))
  }

  async fn unlimited_digest(&self, data: &str) -> Result<String, DigestError> {
    let c = &self.counters;
    self.tracked(&c.unlimited_calls, &c.unlimited_in_flight, &c.max_unlimited).await;
    Ok(format!("U({data})"))
  }
}

/// Fake whose latency depends on the leading digit of the input, so inputs
/// with a low leading digit finish last.
pub struct SkewedDigest;

impl SkewedDigest {
  fn delay_for(data: &str) -> Duration {
    let lead = data.chars().next().and_then(|c| c.to_digit(10)).unwrap_or(0);
    Duration::from_millis(u64::from(10 - lead) * 3)
  }
}

#[async_trait::async_trait]
impl DigestService for SkewedDigest {
  fn name(&self) -> &str {
    "skewed"
  }

  async fn limited_digest(&self, data: &str) -> Result<String, DigestError> {
    tokio::time::sleep(Self::delay_for(data)).await;
    Ok(format!("L({data})"))
  }

  async fn unlimited_digest(&self, data: &str) -> Result<String, DigestError> {
    tokio::time::sleep(Self::delay_for(data)).await;
    Ok(format!("U({data})"))
  }
}

/// Fake whose limited operation fails for one specific input.
pub struct FailingDigest {
  pub fail_on: String,
}

#[async_trait::async_trait]
impl DigestService for FailingDigest {
  fn name(&self) -> &str {
    "failing"
  }

  async fn limited_digest(&self, data: &str) -> Result<String, DigestError> {
    if data == self.fail_on {
      return Err(DigestError::Provider(format!("refused {data}")));
    }
    Ok(format!("L({data})"))
  }

  async fn unlimited_digest(&self, data: &str) -> Result<String, DigestError> {
    Ok(format!("U({data})"))
  }
}

/// Expected MultiHash result for `item` under the `L`/`U` fakes.
pub fn expected_result(item: u64) -> String {
  let token = format!("L({item})~L(U({item}))");
  (0..6).map(|slot| format!("L({slot}{token})")).collect()
}

// ============================================================================
// Pool context
// ============================================================================

/// Pool config with no initial workers and fast generators.
pub fn fast_pool_config() -> PoolConfig {
  PoolConfig {
    initial_workers: 0,
    generator_interval_ms: 1,
    sink_delay_ms: 0,
    ..PoolConfig::default()
  }
}

/// A running pool whose worker sinks are observable from the test.
pub struct PoolTestContext {
  pub handle: PoolHandle,
  pub sinks: mpsc::UnboundedReceiver<WorkerSink>,
  pub cancel: CancellationToken,
}

impl PoolTestContext {
  pub fn spawn(config: PoolConfig) -> Self {
    let cancel = CancellationToken::new();
    let (handle, sinks) = WorkerPool::spawn_observed(config, cancel.clone());
    Self { handle, sinks, cancel }
  }

  /// Wait for the next worker's sink to be handed over.
  pub async fn next_sink(&mut self) -> WorkerSink {
    tokio::time::timeout(Duration::from_secs(5), self.sinks.recv())
      .await
      .expect("sink handed over in time")
      .expect("pool still running")
  }
}

/// Wait until `sink` is closed, discarding buffered values.
///
/// Returns false if it is still open after the timeout.
pub async fn wait_closed(sink: &mut WorkerSink) -> bool {
  tokio::time::timeout(Duration::from_secs(5), async {
    while sink.rx.recv().await.is_some() {}
  })
  .await
  .is_ok()
}

/// Wait for one value on `sink`.
pub async fn recv_value(sink: &mut WorkerSink) -> Option<String> {
  tokio::time::timeout(Duration::from_secs(5), sink.rx.recv())
    .await
    .ok()
    .flatten()
}
