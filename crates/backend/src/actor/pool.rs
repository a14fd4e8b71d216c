//! WorkerPool - supervisor of a runtime-resizable set of workers
//!
//! The supervisor is the single owner of the active worker set. It applies
//! commands strictly in arrival order:
//!
//! - `add` spawns a fresh generator → worker → sink triple and records its handle
//! - `remove` cancels the most recently added worker and forgets its handle
//!   right away, without waiting for the worker to acknowledge
//!
//! # Lifecycle
//!
//! The supervisor runs until one of:
//! - The CancellationToken is triggered
//! - A Shutdown message is received
//! - Every PoolHandle is dropped
//!
//! All remaining workers are cancelled on the way out.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
  handle::PoolHandle,
  message::{PoolCommand, PoolMessage},
  worker::{WorkerHandle, WorkerSink, spawn_worker},
};
use crate::domain::config::PoolConfig;

pub struct WorkerPool {
  config: PoolConfig,
  workers: Vec<WorkerHandle>,
  next_id: usize,
  rx: mpsc::Receiver<PoolMessage>,
  /// Receives every new worker's sink when set; otherwise sinks are drained internally
  observer: Option<mpsc::UnboundedSender<WorkerSink>>,
  cancel: CancellationToken,
}

impl WorkerPool {
  fn new(
    config: PoolConfig,
    rx: mpsc::Receiver<PoolMessage>,
    observer: Option<mpsc::UnboundedSender<WorkerSink>>,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      config,
      workers: Vec::new(),
      next_id: 0,
      rx,
      observer,
      cancel,
    }
  }

  /// Spawn the supervisor with `config.initial_workers` workers and return a
  /// handle for sending commands.
  pub fn spawn(config: PoolConfig, cancel: CancellationToken) -> PoolHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
    let pool = Self::new(config, rx, None, cancel);
    tokio::spawn(pool.run());
    PoolHandle::new(tx)
  }

  /// Like `spawn`, but every worker's sink is handed to the returned receiver
  /// instead of the built-in consumer.
  pub fn spawn_observed(
    config: PoolConfig,
    cancel: CancellationToken,
  ) -> (PoolHandle, mpsc::UnboundedReceiver<WorkerSink>) {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
    let (sink_tx, sink_rx) = mpsc::unbounded_channel();
    let pool = Self::new(config, rx, Some(sink_tx), cancel);
    tokio::spawn(pool.run());
    (PoolHandle::new(tx), sink_rx)
  }

  /// Main supervisor loop
  async fn run(mut self) {
    for _ in 0..self.config.initial_workers {
      self.add_worker();
    }
    info!(workers = self.workers.len(), "WorkerPool started");

    loop {
      tokio::select! {
        biased;

        _ = self.cancel.cancelled() => {
          info!("WorkerPool shutting down (cancelled)");
          break;
        }

        msg = self.rx.recv() => match msg {
          Some(PoolMessage::Command(cmd)) => self.handle_command(cmd),
          Some(PoolMessage::Size { reply }) => {
            let _ = reply.send(self.workers.len());
          }
          Some(PoolMessage::Shutdown) => {
            info!("WorkerPool shutting down (requested)");
            break;
          }
          None => {
            debug!("WorkerPool: all handles dropped");
            break;
          }
        }
      }
    }

    self.cancel_all();
    info!("WorkerPool stopped");
  }

  fn handle_command(&mut self, cmd: PoolCommand) {
    match cmd {
      PoolCommand::Add => self.add_worker(),
      PoolCommand::Remove => self.remove_worker(),
      PoolCommand::Unknown(cmd) => warn!(command = %cmd, "Unknown pool command, ignoring"),
    }
  }

  fn add_worker(&mut self) {
    let id = self.next_id;
    self.next_id += 1;
    let handle = spawn_worker(id, &self.config, self.observer.as_ref());
    self.workers.push(handle);
    info!(worker_id = id, workers = self.workers.len(), "Worker added");
  }

  fn remove_worker(&mut self) {
    let Some(handle) = self.workers.pop() else {
      warn!("Remove requested but no workers are running");
      return;
    };
    let id = handle.id;
    handle.cancel();
    info!(worker_id = id, workers = self.workers.len(), "Worker removed");
  }

  fn cancel_all(&mut self) {
    let count = self.workers.len();
    while let Some(handle) = self.workers.pop() {
      handle.cancel();
    }
    debug!(count, "Cancelled remaining workers");
  }
}
