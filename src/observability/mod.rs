//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! cache, proxy engine, dispatch fabric, origin handler produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
