//! Proxy error types.

use std::io;

use thiserror::Error;

use crate::http::CodecError;

/// Anything that turns a proxied request into a 500.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid request target {target:?}: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request target has no host: {0}")]
    MissingHost(String),

    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("upstream I/O failed: {0}")]
    UpstreamIo(#[source] io::Error),

    #[error("client I/O failed: {0}")]
    ClientIo(#[source] io::Error),

    #[error("bad upstream response: {0}")]
    Codec(#[from] CodecError),
}
