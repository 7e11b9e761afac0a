//! Turning a client's absolute-form request into an origin-form request.
//!
//! # Responsibilities
//! - Resolve host, port and path from the absolute URL
//! - Strip hop-by-hop and client conditional headers
//! - Add Host, `Connection: close` and the proxy's own validators

use url::{Host, Url};

use crate::cache::CacheEntry;
use crate::http::Request;
use crate::proxy::errors::ForwardError;

/// Client header lines never forwarded upstream. The proxy supplies its own
/// `Host`, `Connection` and validators.
const STRIPPED_HEADERS: [&str; 5] = [
    "proxy-connection",
    "if-none-match",
    "if-modified-since",
    "host",
    "connection",
];

/// Where a request goes and what to ask for there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub host: String,
    pub port: u16,
    /// Path plus query, origin-form.
    pub path: String,
}

impl Upstream {
    /// Resolve an absolute request target. Port defaults to 80.
    pub fn from_target(target: &str) -> Result<Self, ForwardError> {
        let url = Url::parse(target).map_err(|source| ForwardError::InvalidTarget {
            target: target.to_string(),
            source,
        })?;

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(ForwardError::MissingHost(target.to_string())),
        };

        let mut path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self {
            host,
            port: url.port().unwrap_or(80),
            path,
        })
    }
}

/// `If-None-Match` / `If-Modified-Since` built from a cached entry's validators.
pub fn conditional_headers(entry: &CacheEntry) -> Vec<(&'static str, String)> {
    let mut headers = Vec::with_capacity(2);
    if let Some(etag) = entry.etag() {
        headers.push(("If-None-Match", etag.to_string()));
    }
    if let Some(last_modified) = entry.last_modified() {
        headers.push(("If-Modified-Since", last_modified.to_string()));
    }
    headers
}

/// Serialize the request that is sent upstream.
pub fn build_upstream_request(
    request: &Request,
    upstream: &Upstream,
    conditional: &[(&'static str, String)],
) -> String {
    let mut out = format!("{} {} {}\r\n", request.method, upstream.path, request.version);

    for line in &request.header_lines {
        let name = line.split(':').next().unwrap_or_default().trim();
        if STRIPPED_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            continue;
        }
        out.push_str(line);
        out.push_str("\r\n");
    }

    out.push_str(&format!("Host: {}\r\n", upstream.host));
    out.push_str("Connection: close\r\n");
    for (name, value) in conditional {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str("\r\n");
    out
}
