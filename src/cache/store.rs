//! Bounded TTL store for upstream responses.
//!
//! A single mutex guards the map; lookup, expiry removal, the eviction scan
//! and the insert each run entirely under it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::cache::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::http::Headers;
use crate::observability::metrics;

/// Identity of a cached response: the client's method and target verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

impl CacheKey {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A stored upstream response. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The response exactly as read from upstream, head and body.
    pub raw_response: Vec<u8>,
    /// Response headers keyed by lowercased name.
    pub headers: Headers,
    pub inserted_at: Instant,
}

impl CacheEntry {
    pub fn etag(&self) -> Option<&str> {
        self.headers.get("etag")
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.headers.get("last-modified")
    }

    /// True while `now - inserted_at < ttl`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// Thread-safe response cache with a fixed capacity and TTL.
pub struct CacheStore {
    entries: Mutex<HashMap<CacheKey, Arc<CacheEntry>>>,
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(config.capacity)),
            capacity: config.capacity,
            ttl: config.ttl(),
            clock,
        }
    }

    /// Return the entry for `(method, url)` if present and unexpired.
    ///
    /// An expired entry is removed as a side effect. Lookups never refresh
    /// an entry's age.
    pub fn lookup(&self, method: &str, url: &str) -> Option<Arc<CacheEntry>> {
        let key = CacheKey::new(method, url);
        let mut entries = self.entries.lock();
        let now = self.clock.now();

        let fresh = match entries.get(&key) {
            Some(entry) => entry.is_fresh(now, self.ttl),
            None => {
                metrics::record_cache_miss();
                return None;
            }
        };

        if fresh {
            metrics::record_cache_hit();
            return entries.get(&key).cloned();
        }

        entries.remove(&key);
        metrics::record_cache_expired();
        metrics::record_cache_size(entries.len());
        tracing::debug!(cache_key = %key, "Cache entry expired");
        None
    }

    /// Store a response, replacing any entry for the same key.
    ///
    /// A new key arriving at capacity first evicts the entry with the oldest
    /// insertion time.
    pub fn insert(&self, method: &str, url: &str, raw_response: Vec<u8>, headers: Headers) {
        if self.capacity == 0 {
            return;
        }

        let key = CacheKey::new(method, url);
        let mut entries = self.entries.lock();

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                metrics::record_cache_eviction();
                tracing::debug!(evicted = %oldest, "Cache full, evicted oldest entry");
            }
        }

        let entry = CacheEntry {
            raw_response,
            headers,
            inserted_at: self.clock.now(),
        };
        entries.insert(key, Arc::new(entry));
        metrics::record_cache_insert(entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Presence check that ignores expiry and leaves the store untouched.
    pub fn contains(&self, method: &str, url: &str) -> bool {
        self.entries.lock().contains_key(&CacheKey::new(method, url))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.len())
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}
