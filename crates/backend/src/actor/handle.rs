//! Actor handles for communicating with actors
//!
//! Handles are cheap to clone and provide a way to send messages to actors.

use tokio::sync::{mpsc, oneshot};

use super::message::{PoolCommand, PoolMessage};

// ============================================================================
// Pool Handle
// ============================================================================

/// Handle to communicate with a WorkerPool supervisor
///
/// Every command goes through the supervisor's single queue, so concurrent
/// callers never race on the set of active workers.
#[derive(Clone, Debug)]
pub struct PoolHandle {
  tx: mpsc::Sender<PoolMessage>,
}

impl PoolHandle {
  /// Create a new handle from a sender
  pub(crate) fn new(tx: mpsc::Sender<PoolMessage>) -> Self {
    Self { tx }
  }

  /// Send a text command (`add` or `remove`; anything else is logged and ignored)
  pub async fn command(&self, cmd: &str) -> Result<(), SendError> {
    self.send(PoolMessage::Command(PoolCommand::from(cmd))).await
  }

  pub async fn add(&self) -> Result<(), SendError> {
    self.send(PoolMessage::Command(PoolCommand::Add)).await
  }

  pub async fn remove(&self) -> Result<(), SendError> {
    self.send(PoolMessage::Command(PoolCommand::Remove)).await
  }

  /// Number of active workers once every previously sent command was applied
  pub async fn size(&self) -> Result<usize, SendError> {
    let (reply, rx) = oneshot::channel();
    self.send(PoolMessage::Size { reply }).await?;
    rx.await.map_err(|_| SendError::ActorGone)
  }

  /// Cancel every worker and stop the supervisor
  pub async fn shutdown(&self) -> Result<(), SendError> {
    self.send(PoolMessage::Shutdown).await
  }

  /// Resolves once the supervisor has stopped and released its queue
  pub async fn closed(&self) {
    self.tx.closed().await
  }

  async fn send(&self, msg: PoolMessage) -> Result<(), SendError> {
    self.tx.send(msg).await.map_err(|_| SendError::ActorGone)
  }
}

// ============================================================================
// Errors
// ============================================================================

/// Error when sending to an actor
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
  #[error("Actor has shut down")]
  ActorGone,
}
