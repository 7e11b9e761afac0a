//! Multi-queue static file origin server.
//!
//! # Data Flow
//! ```text
//! accept loop (server.rs)
//!     → DispatchFabric::enqueue (random queue)
//!     → worker: handler.rs (single read, parse, resolve, conditional GET)
//!     → response written, connection closed
//! ```

pub mod handler;
pub mod server;

pub use handler::{OriginError, OriginHandler};
pub use server::{connection_handler, Connection, OriginServer, OriginServerError};
