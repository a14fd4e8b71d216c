//! Actor-based concurrency primitives
//!
//! Components run as long-lived tasks and talk through `mpsc` channels.
//! State is owned, not shared; the only shared resource is the rate-limit slot
//! inside the digest service.
//!
//! # Components
//!
//! - [`pipeline`]: staged signing pipeline (`SingleHash → MultiHash → Combine`)
//! - [`WorkerPool`]: supervisor of a resizable set of generator → worker → sink triples
//! - [`PoolHandle`]: cheap-to-clone handle used to drive the supervisor

pub mod handle;
pub mod message;
pub mod pipeline;
mod pool;
pub mod worker;


pub use handle::{PoolHandle, SendError};
pub use pool::WorkerPool;
