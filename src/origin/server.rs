//! Origin server: accept loop feeding the dispatch fabric.

use std::net::{Shutdown as SocketShutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;

use crate::config::TestbedConfig;
use crate::dispatch::{DispatchError, DispatchFabric};
use crate::lifecycle::{ServerHandle, Shutdown};
use crate::net::{ConnectionId, ConnectionTracker, Listener, ListenerError};
use crate::origin::handler::OriginHandler;

/// Startup failures of the origin server.
#[derive(Debug, thiserror::Error)]
pub enum OriginServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("failed to spawn accept thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// An accepted client connection waiting on a queue.
#[derive(Debug)]
pub struct Connection {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    pub id: ConnectionId,
}

/// Build the job handler that serves one queued connection and closes it.
pub fn connection_handler(
    handler: Arc<OriginHandler>,
    tracker: ConnectionTracker,
) -> impl Fn(Connection) + Send + Sync + 'static {
    move |mut conn: Connection| {
        let _guard = tracker.track(conn.id);
        tracing::debug!(connection_id = %conn.id, peer_addr = %conn.peer, "Processing connection");
        handler.handle(&mut conn.stream, conn.peer);
        let _ = conn.stream.shutdown(SocketShutdown::Both);
    }
}

/// Static file server whose connections are spread over worker queues.
pub struct OriginServer {
    listener: Listener,
    fabric: DispatchFabric<Connection>,
    tracker: ConnectionTracker,
}

impl OriginServer {
    /// Bind the listener and start every worker.
    pub fn bind(config: &TestbedConfig) -> Result<Self, OriginServerError> {
        let listener = Listener::bind(&config.origin.bind_address)?;
        let handler = Arc::new(OriginHandler::new(&config.origin));
        let tracker = ConnectionTracker::new("origin");
        let fabric = DispatchFabric::start(
            &config.dispatch,
            connection_handler(handler, tracker.clone()),
        )?;

        tracing::info!(
            address = %listener.local_addr(),
            document_root = %config.origin.document_root.display(),
            "Origin server ready"
        );
        Ok(Self {
            listener,
            fabric,
            tracker,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Accept until `shutdown` fires, then stop and join every worker.
    pub fn run(self, shutdown: &Shutdown) {
        let fabric = &self.fabric;
        self.listener.run(shutdown, |stream, peer, id| {
            let queue = fabric.enqueue(Connection { stream, peer, id });
            tracing::debug!(connection_id = %id, peer_addr = %peer, queue, "Connection enqueued");
        });
        self.fabric.shutdown();
    }

    /// Run the accept loop on a background thread.
    pub fn spawn(self) -> Result<ServerHandle, OriginServerError> {
        let local_addr = self.local_addr();
        let shutdown = Shutdown::new();
        let loop_shutdown = shutdown.clone();
        let thread = thread::Builder::new()
            .name("origin-accept".to_string())
            .spawn(move || self.run(&loop_shutdown))
            .map_err(OriginServerError::Spawn)?;
        Ok(ServerHandle::new(local_addr, shutdown, thread))
    }
}
