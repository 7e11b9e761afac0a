//! Proxy listener: one thread per accepted connection.

use std::net::{Shutdown as SocketShutdown, SocketAddr};
use std::sync::Arc;
use std::thread;

use crate::cache::CacheStore;
use crate::config::TestbedConfig;
use crate::lifecycle::{ServerHandle, Shutdown};
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::proxy::engine::ProxyEngine;

/// Caching forward proxy server.
pub struct ProxyServer {
    listener: Listener,
    engine: Arc<ProxyEngine>,
    tracker: ConnectionTracker,
}

impl ProxyServer {
    /// Bind with a fresh cache built from `config.cache`.
    pub fn bind(config: &TestbedConfig) -> Result<Self, ListenerError> {
        let cache = Arc::new(CacheStore::new(&config.cache));
        Self::bind_with_cache(config, cache)
    }

    /// Bind using an existing cache handle.
    pub fn bind_with_cache(
        config: &TestbedConfig,
        cache: Arc<CacheStore>,
    ) -> Result<Self, ListenerError> {
        let listener = Listener::bind(&config.proxy.bind_address)?;
        tracing::info!(
            address = %listener.local_addr(),
            cache_capacity = cache.capacity(),
            cache_ttl_secs = cache.ttl().as_secs(),
            "Proxy server ready"
        );
        Ok(Self {
            listener,
            engine: Arc::new(ProxyEngine::new(cache, config.proxy.buffer_size)),
            tracker: ConnectionTracker::new("proxy"),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn cache(&self) -> Arc<CacheStore> {
        Arc::clone(self.engine.cache())
    }

    /// Accept until `shutdown` fires. Connection threads are detached.
    pub fn run(self, shutdown: &Shutdown) {
        self.listener.run(shutdown, |mut stream, peer, id| {
            let engine = Arc::clone(&self.engine);
            let guard = self.tracker.track(id);
            let spawned = thread::Builder::new()
                .name(format!("proxy-{}", id))
                .spawn(move || {
                    let _guard = guard;
                    engine.handle(&mut stream, peer);
                    let _ = stream.shutdown(SocketShutdown::Both);
                });
            if let Err(e) = spawned {
                tracing::error!(connection_id = %id, error = %e, "Failed to spawn connection thread");
            }
        });
    }

    /// Run the accept loop on a background thread.
    pub fn spawn(self) -> std::io::Result<ServerHandle> {
        let local_addr = self.local_addr();
        let shutdown = Shutdown::new();
        let loop_shutdown = shutdown.clone();
        let thread = thread::Builder::new()
            .name("proxy-accept".to_string())
            .spawn(move || self.run(&loop_shutdown))?;
        Ok(ServerHandle::new(local_addr, shutdown, thread))
    }
}
