//! Actor message types
//!
//! ## Pipeline Message Types
//!
//! The signing pipeline passes one message type per channel:
//!
//! ```text
//! feeder → SingleHash → MultiHash → Combine
//!   Item      Token       String     Report
//! ```
//!
//! ## Pool Messages
//!
//! The worker pool supervisor consumes [`PoolMessage`]s. Text commands from
//! the outside are parsed into [`PoolCommand`]s first.

use std::fmt;

use tokio::sync::oneshot;

// ============================================================================
// Pipeline Message Types
// ============================================================================

/// Input unit of the signing pipeline
pub type Item = u64;

/// Output of the SingleHash stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  /// `limited(item) ~ limited(unlimited(item))`
  pub digest: String,
  /// Item this token was derived from (diagnostics only)
  pub origin: Item,
}

impl Token {
  pub fn new(origin: Item, direct: &str, transformed: &str) -> Self {
    Self {
      digest: format!("{direct}~{transformed}"),
      origin,
    }
  }
}

// ============================================================================
// Pool Messages
// ============================================================================

/// A text command understood by the worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolCommand {
  /// Start one more worker
  Add,
  /// Cancel the most recently added worker
  Remove,
  /// Anything else; logged and ignored
  Unknown(String),
}

impl From<&str> for PoolCommand {
  fn from(s: &str) -> Self {
    match s {
      "add" => Self::Add,
      "remove" => Self::Remove,
      other => Self::Unknown(other.to_string()),
    }
  }
}

impl fmt::Display for PoolCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Add => write!(f, "add"),
      Self::Remove => write!(f, "remove"),
      Self::Unknown(cmd) => write!(f, "{cmd}"),
    }
  }
}

/// A message sent to the WorkerPool supervisor
#[derive(Debug)]
pub enum PoolMessage {
  /// Resize command
  Command(PoolCommand),
  /// Report the number of active workers
  Size { reply: oneshot::Sender<usize> },
  /// Cancel every worker and stop the supervisor
  Shutdown,
}
