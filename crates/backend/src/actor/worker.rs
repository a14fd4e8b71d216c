//! Pool workers - one generator → worker → sink triple per worker.
//!
//! ```text
//! generator ──gen_rx──▶ worker ──sink──▶ consumer
//!                         ▲
//!                       cancel (oneshot)
//! ```
//!
//! A worker owns its generator receiver, its sink sender and its cancel
//! receiver exclusively. When it exits, for whatever reason, the sink sender
//! is dropped, which is the teardown signal observed by the consumer.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::domain::config::PoolConfig;

/// Supervisor's handle on a running worker.
///
/// The cancel sender is the only thing shared with the worker task.
#[derive(Debug)]
pub struct WorkerHandle {
  pub id: usize,
  cancel: oneshot::Sender<()>,
}

impl WorkerHandle {
  /// Signal the worker to stop. Never blocks and never waits for an
  /// acknowledgement; a worker that already exited is fine.
  pub fn cancel(self) {
    if self.cancel.send(()).is_err() {
      trace!(worker_id = self.id, "Worker already exited before cancel");
    }
  }
}

/// Receiving end of a worker's sink, handed to whoever consumes the output.
#[derive(Debug)]
pub struct WorkerSink {
  pub worker_id: usize,
  pub rx: mpsc::Receiver<String>,
}

/// Spawn the generator, worker and (optionally) consumer tasks of one worker.
///
/// With `observer` set, the sink is handed over instead of being drained by
/// the default consumer.
pub fn spawn_worker(
  id: usize,
  config: &PoolConfig,
  observer: Option<&mpsc::UnboundedSender<WorkerSink>>,
) -> WorkerHandle {
  let buffer = config.channel_buffer.max(1);
  let (gen_tx, gen_rx) = mpsc::channel(buffer);
  let (sink_tx, sink_rx) = mpsc::channel(buffer);
  let (cancel_tx, cancel_rx) = oneshot::channel();

  tokio::spawn(generate(
    id,
    id as u64,
    config.generator_limit,
    config.generator_interval(),
    gen_tx,
  ));

  let sink = WorkerSink {
    worker_id: id,
    rx: sink_rx,
  };
  match observer {
    Some(observer) => {
      if let Err(mpsc::error::SendError(sink)) = observer.send(sink) {
        trace!(worker_id = id, "Sink observer gone, draining sink instead");
        tokio::spawn(consume(sink, config.sink_delay()));
      }
    }
    None => {
      tokio::spawn(consume(sink, config.sink_delay()));
    }
  }

  tokio::spawn(run_worker(id, gen_rx, sink_tx, cancel_rx));

  WorkerHandle { id, cancel: cancel_tx }
}

/// Worker loop: forward generated values to the sink until cancelled or the
/// generator is exhausted.
pub async fn run_worker(
  id: usize,
  mut input: mpsc::Receiver<String>,
  sink: mpsc::Sender<String>,
  mut cancel: oneshot::Receiver<()>,
) {
  trace!(worker_id = id, "Worker starting");
  let mut forwarded = 0usize;

  loop {
    tokio::select! {
      biased;

      _ = &mut cancel => {
        debug!(worker_id = id, forwarded, "Worker cancelled");
        break;
      }

      msg = input.recv() => {
        let Some(value) = msg else {
          debug!(worker_id = id, forwarded, "Worker: generator exhausted");
          break;
        };

        // A cancel must not wait behind a full sink.
        tokio::select! {
          biased;
          _ = &mut cancel => {
            debug!(worker_id = id, forwarded, "Worker cancelled while forwarding");
            break;
          }
          result = sink.send(value) => {
            if result.is_err() {
              trace!(worker_id = id, "Worker: sink consumer gone");
              break;
            }
            forwarded += 1;
          }
        }
      }
    }
  }

  // Dropping `sink` here closes the consumer side.
  trace!(worker_id = id, forwarded, "Worker finished");
}

/// Generator: yields `start`, `start + 1`, ... up to `limit`, pausing
/// `interval` after each value. Stops once the worker drops its receiver.
pub async fn generate(id: usize, start: u64, limit: u64, interval: Duration, tx: mpsc::Sender<String>) {
  for n in start..limit {
    if tx.send(n.to_string()).await.is_err() {
      trace!(worker_id = id, "Generator: worker gone");
      return;
    }
    if !interval.is_zero() {
      tokio::time::sleep(interval).await;
    }
  }
  trace!(worker_id = id, "Generator exhausted");
}

/// Default sink consumer: drains the sink with a fixed per-value delay.
pub async fn consume(mut sink: WorkerSink, delay: Duration) {
  let mut received = 0usize;
  while let Some(value) = sink.rx.recv().await {
    trace!(worker_id = sink.worker_id, value = %value, "Sink received");
    received += 1;
    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }
  }
  trace!(worker_id = sink.worker_id, received, "Sink closed");
}
