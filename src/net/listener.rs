//! Blocking TCP listener shared by both services.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Run the accept loop until shutdown is triggered
//! - Survive accept errors (logged, loop continues)

use std::net::{SocketAddr, TcpListener, TcpStream};

use thiserror::Error;

use crate::lifecycle::Shutdown;
use crate::net::connection::ConnectionId;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
}

/// A bound listening socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to `address` (`host:port`, names are resolved).
    pub fn bind(address: &str) -> Result<Self, ListenerError> {
        let bind_err = |source| ListenerError::Bind {
            address: address.to_string(),
            source,
        };
        let inner = TcpListener::bind(address).map_err(bind_err)?;
        let local_addr = inner.local_addr().map_err(bind_err)?;

        tracing::info!(address = %local_addr, "Listener bound");
        Ok(Self { inner, local_addr })
    }

    /// Accept one connection, blocking.
    pub fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionId), ListenerError> {
        let (stream, addr) = self.inner.accept().map_err(ListenerError::Accept)?;
        let id = ConnectionId::next();
        tracing::debug!(connection_id = %id, peer_addr = %addr, "Connection accepted");
        Ok((stream, addr, id))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept until `shutdown` fires, handing each connection to `on_accept`.
    ///
    /// The flag is checked after every accept, so a wake-up connection is
    /// needed to unblock a listener that is otherwise idle.
    pub fn run<F>(&self, shutdown: &Shutdown, mut on_accept: F)
    where
        F: FnMut(TcpStream, SocketAddr, ConnectionId),
    {
        loop {
            let accepted = self.accept();
            if shutdown.is_triggered() {
                tracing::info!(address = %self.local_addr, "Listener stopping");
                break;
            }
            match accepted {
                Ok((stream, addr, id)) => on_accept(stream, addr, id),
                Err(e) => tracing::warn!(error = %e, "Accept failed"),
            }
        }
    }
}
