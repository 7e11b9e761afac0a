//! Configuration schema definitions.
//!
//! Every field has a default so an empty file (or no file) yields a working
//! setup. All types derive Serde traits for deserialization from TOML.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration covering both services.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TestbedConfig {
    /// Caching forward proxy listener.
    pub proxy: ProxyConfig,

    /// Proxy response cache.
    pub cache: CacheConfig,

    /// Static file origin server.
    pub origin: OriginConfig,

    /// Origin worker queues.
    pub dispatch: DispatchConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Proxy listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Bind address (e.g., "localhost:8888").
    pub bind_address: String,

    /// Chunk size for socket reads, client and upstream side.
    pub buffer_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_address: "localhost:8888".to_string(),
            buffer_size: 4096,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached responses.
    pub capacity: usize,

    /// Time-to-live of an entry in seconds.
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            ttl_secs: 300,
        }
    }
}

/// Origin server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Bind address (e.g., "localhost:8080").
    pub bind_address: String,

    /// Directory files are served from.
    pub document_root: PathBuf,

    /// Resource served for `/`.
    pub default_resource: String,

    /// Path that is answered only after `slow_delay_ms`.
    pub slow_path: String,

    /// Artificial delay applied to `slow_path`, in milliseconds.
    pub slow_delay_ms: u64,

    /// Size of the single read used to receive a request.
    pub read_buffer_size: usize,
}

impl OriginConfig {
    pub fn slow_delay(&self) -> Duration {
        Duration::from_millis(self.slow_delay_ms)
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            bind_address: "localhost:8080".to_string(),
            document_root: PathBuf::from("."),
            default_resource: "/test.html".to_string(),
            slow_path: "/slow.html".to_string(),
            slow_delay_ms: 5_000,
            read_buffer_size: 1024,
        }
    }
}

/// Worker queue layout for the origin server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number of independent FIFO queues.
    pub num_queues: usize,

    /// Worker threads bound to each queue.
    pub threads_per_queue: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            num_queues: 10,
            threads_per_queue: 64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Serve Prometheus metrics.
    pub metrics_enabled: bool,

    /// Address of the metrics endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "proxy_testbed=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
