//! WorkerPool E2E tests.
//!
//! Drives the supervisor through its handle and observes worker sinks to
//! check that resizing starts and tears down the right workers.

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use pretty_assertions::assert_eq;

  use crate::{
    actor::{
      SendError, WorkerPool,
      __tests__::helpers::{PoolTestContext, fast_pool_config, recv_value, wait_closed},
    },
    domain::config::PoolConfig,
  };

  /// Test: Initial workers are started and each streams from its own ordinal.
  #[tokio::test]
  async fn test_initial_workers_start() {
    let mut ctx = PoolTestContext::spawn(PoolConfig {
      initial_workers: 3,
      ..fast_pool_config()
    });

    assert_eq!(ctx.handle.size().await.unwrap(), 3);
    for expected_id in 0..3 {
      let mut sink = ctx.next_sink().await;
      assert_eq!(sink.worker_id, expected_id);
      assert_eq!(recv_value(&mut sink).await, Some(expected_id.to_string()));
    }

    ctx.cancel.cancel();
  }

  /// Test: k adds followed by k removes restores the size and closes the
  /// sinks of every removed worker.
  #[tokio::test]
  async fn test_add_then_remove_restores_size() {
    let mut ctx = PoolTestContext::spawn(fast_pool_config());

    for _ in 0..4 {
      ctx.handle.add().await.unwrap();
    }
    assert_eq!(ctx.handle.size().await.unwrap(), 4);

    let mut sinks = Vec::new();
    for _ in 0..4 {
      sinks.push(ctx.next_sink().await);
    }

    for _ in 0..4 {
      ctx.handle.remove().await.unwrap();
    }
    assert_eq!(ctx.handle.size().await.unwrap(), 0);

    for sink in &mut sinks {
      assert!(wait_closed(sink).await, "sink of worker {} should close", sink.worker_id);
    }

    ctx.cancel.cancel();
  }

  /// Test: Remove cancels the most recently added worker only.
  #[tokio::test]
  async fn test_remove_cancels_most_recent() {
    let mut ctx = PoolTestContext::spawn(PoolConfig {
      initial_workers: 2,
      ..fast_pool_config()
    });
    let mut first = ctx.next_sink().await;
    let mut second = ctx.next_sink().await;

    ctx.handle.add().await.unwrap();
    let mut third = ctx.next_sink().await;
    assert_eq!(third.worker_id, 2);

    ctx.handle.remove().await.unwrap();
    assert_eq!(ctx.handle.size().await.unwrap(), 2);
    assert!(wait_closed(&mut third).await);

    // Survivors keep producing.
    assert!(recv_value(&mut first).await.is_some());
    assert!(recv_value(&mut second).await.is_some());

    ctx.cancel.cancel();
  }

  /// Test: Remove on an empty pool is a no-op and the supervisor keeps running.
  #[tokio::test]
  async fn test_remove_on_empty_pool() {
    let mut ctx = PoolTestContext::spawn(fast_pool_config());

    ctx.handle.remove().await.unwrap();
    assert_eq!(ctx.handle.size().await.unwrap(), 0);

    ctx.handle.add().await.unwrap();
    assert_eq!(ctx.handle.size().await.unwrap(), 1);
    let sink = ctx.next_sink().await;
    assert_eq!(sink.worker_id, 0);

    ctx.cancel.cancel();
  }

  /// Test: Unknown text commands are ignored.
  #[tokio::test]
  async fn test_unknown_command_is_ignored() {
    let ctx = PoolTestContext::spawn(fast_pool_config());

    ctx.handle.command("add").await.unwrap();
    ctx.handle.command("grow").await.unwrap();
    ctx.handle.command("").await.unwrap();
    assert_eq!(ctx.handle.size().await.unwrap(), 1);

    ctx.handle.command("remove").await.unwrap();
    assert_eq!(ctx.handle.size().await.unwrap(), 0);

    ctx.cancel.cancel();
  }

  /// Test: Shutdown tears down every worker and the supervisor.
  #[tokio::test]
  async fn test_shutdown_cancels_all_workers() {
    let mut ctx = PoolTestContext::spawn(PoolConfig {
      initial_workers: 3,
      ..fast_pool_config()
    });
    let mut sinks = Vec::new();
    for _ in 0..3 {
      sinks.push(ctx.next_sink().await);
    }

    ctx.handle.shutdown().await.unwrap();

    for sink in &mut sinks {
      assert!(wait_closed(sink).await);
    }
    // Supervisor is gone once its queue is dropped.
    tokio::time::timeout(Duration::from_secs(5), ctx.handle.closed())
      .await
      .expect("supervisor should stop");
    assert!(matches!(ctx.handle.size().await, Err(SendError::ActorGone)));
  }

  /// Test: Cancelling the token stops the pool like a shutdown.
  #[tokio::test]
  async fn test_cancel_token_stops_pool() {
    let mut ctx = PoolTestContext::spawn(PoolConfig {
      initial_workers: 1,
      ..fast_pool_config()
    });
    let mut sink = ctx.next_sink().await;

    ctx.cancel.cancel();

    assert!(wait_closed(&mut sink).await);
    tokio::time::timeout(Duration::from_secs(5), ctx.handle.closed())
      .await
      .expect("supervisor should stop");
  }

  /// Test: Without an observer, the built-in consumer drains the sinks.
  #[tokio::test]
  async fn test_unobserved_pool_resizes() {
    let cancel = tokio_util::sync::CancellationToken::new();
    let handle = WorkerPool::spawn(
      PoolConfig {
        initial_workers: 2,
        ..fast_pool_config()
      },
      cancel.clone(),
    );

    handle.add().await.unwrap();
    handle.remove().await.unwrap();
    handle.remove().await.unwrap();
    assert_eq!(handle.size().await.unwrap(), 1);

    cancel.cancel();
  }
}
