//! Shutdown coordination for the listeners.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Shared stop flag observed by accept loops.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

/// A service running its accept loop on a background thread.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    thread: JoinHandle<()>,
}

impl ServerHandle {
    pub(crate) fn new(local_addr: SocketAddr, shutdown: Shutdown, thread: JoinHandle<()>) -> Self {
        Self {
            local_addr,
            shutdown,
            thread,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and wait for the accept loop (and anything it owns) to finish.
    pub fn shutdown(self) {
        self.shutdown.trigger();
        // unblock the pending accept
        let mut wake_addr = self.local_addr;
        if wake_addr.ip().is_unspecified() {
            wake_addr.set_ip(match wake_addr {
                SocketAddr::V4(_) => Ipv4Addr::LOCALHOST.into(),
                SocketAddr::V6(_) => Ipv6Addr::LOCALHOST.into(),
            });
        }
        if let Err(e) = TcpStream::connect(wake_addr) {
            tracing::warn!(error = %e, "Failed to wake listener");
        }
        if self.thread.join().is_err() {
            tracing::error!(address = %self.local_addr, "Server thread panicked");
        }
    }
}
