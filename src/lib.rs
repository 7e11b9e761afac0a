//! HTTP/1.x testbed: a caching forward proxy and a multi-queue origin server.
//!
//! # Architecture Overview
//!
//! ```text
//!   client ──▶ proxy::server ──▶ proxy::engine ⇄ cache::store
//!                                     │
//!                                     ▼
//!                          upstream (fresh TCP, read to EOF)
//!
//!   client ──▶ origin::server ──▶ dispatch::fabric ──▶ queue N ──▶ worker
//!                                                               │
//!                                                               ▼
//!                                                    origin::handler ──▶ filesystem
//! ```
//!
//! Both services use blocking sockets on OS threads. The proxy spawns one
//! thread per connection; the origin server spreads connections at random
//! over independent worker queues so a slow request only stalls its own
//! queue.

// Shared plumbing
pub mod config;
pub mod http;
pub mod net;

// Services
pub mod cache;
pub mod dispatch;
pub mod origin;
pub mod proxy;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use cache::CacheStore;
pub use config::TestbedConfig;
pub use dispatch::DispatchFabric;
pub use lifecycle::{ServerHandle, Shutdown};
pub use origin::OriginServer;
pub use proxy::ProxyServer;
