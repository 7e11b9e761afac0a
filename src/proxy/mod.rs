//! Caching forward proxy.
//!
//! # Data Flow
//! ```text
//! client (absolute-form request)
//!     → server.rs (accept, thread per connection)
//!     → engine.rs (parse, cache lookup)
//!     → rewrite.rs (origin-form request, validators)
//!     → upstream round trip (read to EOF)
//!     → engine.rs (304 → cached copy | 200 → cache + relay | other → relay)
//! ```

pub mod engine;
pub mod errors;
pub mod rewrite;
pub mod server;

pub use engine::{ProxyEngine, Served};
pub use errors::ForwardError;
pub use rewrite::{build_upstream_request, conditional_headers, Upstream};
pub use server::ProxyServer;
