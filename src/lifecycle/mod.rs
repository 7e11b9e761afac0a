//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Bind listener → Start workers → Accept loop thread
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C / test teardown → flag set → listener woken → loop exits
//!     → origin only: one stop sentinel per worker, workers joined
//!
//! Signals (signals.rs):
//!     SIGINT → Trigger shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{ServerHandle, Shutdown};
pub use signals::wait_for_ctrl_c;
