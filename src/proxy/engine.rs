//! Per-connection forwarding logic.
//!
//! # Responsibilities
//! - Read and validate the client request
//! - Consult the cache and attach validators for revalidation
//! - Forward upstream over a fresh connection and read to EOF
//! - Serve the cached copy on 304, cache fresh 200s, relay everything else
//!
//! # Design Decisions
//! - One request per client connection, one upstream connection per request
//! - Only status 200 populates the cache
//! - Failures become a best-effort 500 scoped to the one connection

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::http::{find_header_end, parse_response_head, Request, Response, StatusCode};
use crate::observability::metrics;
use crate::proxy::errors::ForwardError;
use crate::proxy::rewrite::{build_upstream_request, conditional_headers, Upstream};

/// What the client ended up receiving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// The proxy answered by itself (400, 501).
    Rejected(StatusCode),
    /// Upstream answered 304 and the cached response was sent.
    Revalidated,
    /// The upstream response was relayed as received.
    Forwarded { status: u16, cached: bool },
}

/// Caching forwarder shared by all connection threads.
#[derive(Debug)]
pub struct ProxyEngine {
    cache: Arc<CacheStore>,
    buffer_size: usize,
}

impl ProxyEngine {
    pub fn new(cache: Arc<CacheStore>, buffer_size: usize) -> Self {
        Self {
            cache,
            buffer_size: buffer_size.max(1),
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Serve one request from `client`. Never fails: errors are answered
    /// with a 500 when the client is still writable.
    pub fn handle<S: Read + Write>(&self, client: &mut S, peer: SocketAddr) {
        match self.serve(client, peer) {
            Ok(Served::Rejected(status)) => {
                metrics::record_proxy_response(status.as_u16());
                tracing::info!(peer_addr = %peer, status = status.as_u16(), "Request rejected");
            }
            Ok(Served::Revalidated) => {
                metrics::record_proxy_response(200);
            }
            Ok(Served::Forwarded { status, cached }) => {
                metrics::record_proxy_response(status);
                tracing::debug!(peer_addr = %peer, status, cached, "Response relayed");
            }
            Err(e) => {
                tracing::error!(peer_addr = %peer, error = %e, "Error handling client");
                metrics::record_proxy_response(500);
                let response = Response::new(StatusCode::InternalServerError).to_bytes(false);
                let _ = client.write_all(&response).and_then(|_| client.flush());
            }
        }
    }

    fn serve<S: Read + Write>(&self, client: &mut S, peer: SocketAddr) -> Result<Served, ForwardError> {
        let raw = self.read_request(client)?;
        if raw.is_empty() {
            tracing::debug!(peer_addr = %peer, "Client sent no data");
            return self.reject(client, Response::new(StatusCode::BadRequest));
        }

        let request = match Request::parse(&raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(peer_addr = %peer, error = %e, "Malformed request");
                return self.reject(client, Response::new(StatusCode::BadRequest));
            }
        };
        tracing::info!(
            peer_addr = %peer,
            method = %request.method,
            url = %request.target,
            "Received request"
        );

        if !request.is_supported_method() {
            let response = Response::new(StatusCode::NotImplemented).with_version(&request.version);
            return self.reject(client, response);
        }

        let cached = self.cache.lookup(&request.method, &request.target);
        let conditional = cached
            .as_deref()
            .map(conditional_headers)
            .unwrap_or_default();

        let upstream = Upstream::from_target(&request.target)?;
        let upstream_request = build_upstream_request(&request, &upstream, &conditional);
        tracing::debug!(
            host = %upstream.host,
            port = upstream.port,
            revalidating = !conditional.is_empty(),
            "Forwarding request"
        );

        let response = self.fetch(&upstream, upstream_request.as_bytes())?;
        let head = parse_response_head(&response)?;
        tracing::info!(host = %upstream.host, status_line = %head.status_line, "Received upstream response");

        let was_cached = cached.is_some();
        if let Some(entry) = cached.filter(|_| head.status == 304) {
            tracing::info!(url = %request.target, "Serving cached response");
            metrics::record_revalidation("not_modified");
            client
                .write_all(&entry.raw_response)
                .and_then(|_| client.flush())
                .map_err(ForwardError::ClientIo)?;
            return Ok(Served::Revalidated);
        }

        if head.status == 200 {
            if was_cached {
                metrics::record_revalidation("refreshed");
            }
            self.cache.insert(
                &request.method,
                &request.target,
                response.clone(),
                head.headers,
            );
        }

        client
            .write_all(&response)
            .and_then(|_| client.flush())
            .map_err(ForwardError::ClientIo)?;
        Ok(Served::Forwarded {
            status: head.status,
            cached: head.status == 200,
        })
    }

    /// Read until the end of the header block or EOF.
    fn read_request<S: Read>(&self, client: &mut S) -> Result<Vec<u8>, ForwardError> {
        let mut request = Vec::new();
        let mut chunk = vec![0u8; self.buffer_size];
        loop {
            let n = client.read(&mut chunk).map_err(ForwardError::ClientIo)?;
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if find_header_end(&request).is_some() {
                break;
            }
        }
        Ok(request)
    }

    fn reject<S: Write>(&self, client: &mut S, response: Response) -> Result<Served, ForwardError> {
        client
            .write_all(&response.to_bytes(false))
            .and_then(|_| client.flush())
            .map_err(ForwardError::ClientIo)?;
        Ok(Served::Rejected(response.status))
    }

    /// One round trip over a fresh connection, reading until upstream closes.
    fn fetch(&self, upstream: &Upstream, request: &[u8]) -> Result<Vec<u8>, ForwardError> {
        let mut stream = TcpStream::connect((upstream.host.as_str(), upstream.port)).map_err(|source| {
            ForwardError::Connect {
                host: upstream.host.clone(),
                port: upstream.port,
                source,
            }
        })?;
        stream.write_all(request).map_err(ForwardError::UpstreamIo)?;

        let mut response = Vec::new();
        let mut chunk = vec![0u8; self.buffer_size];
        loop {
            let n = stream.read(&mut chunk).map_err(ForwardError::UpstreamIo)?;
            if n == 0 {
                break;
            }
            response.extend_from_slice(&chunk[..n]);
        }
        Ok(response)
    }
}
