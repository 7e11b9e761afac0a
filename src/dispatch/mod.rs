//! Multi-queue dispatch for the origin server.
//!
//! # Data Flow
//! ```text
//! accept loop
//!     → fabric.rs enqueue (uniform random queue, no load awareness)
//!     → queue.rs (FIFO per queue)
//!     → worker thread bound to that queue
//!     → handler runs to completion, worker blocks on the queue again
//! ```
//!
//! # Design Decisions
//! - Queues are never shared between pools; this bounds head-of-line blocking
//! - A stop sentinel ends one worker; shutdown pushes one per worker
//! - Generic over the job type so the same fabric can carry any connection kind

pub mod fabric;
pub mod queue;

pub use fabric::{DispatchError, DispatchFabric};
pub use queue::{Task, TaskQueue};
