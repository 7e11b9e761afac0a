//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (blocking accept loop)
//!     → connection.rs (ID, in-flight tracking)
//!     → proxy: one thread per connection
//!     → origin: dispatch fabric queue
//! ```
//!
//! # Design Decisions
//! - Blocking sockets and OS threads; no event loop
//! - Accept errors never stop the loop
//! - No request timeouts: a stalled peer holds its thread

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Listener, ListenerError};
