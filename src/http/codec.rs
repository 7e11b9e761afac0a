//! Request and response head parsing.
//!
//! # Responsibilities
//! - Split a raw request into method, target, version and header lines
//! - Build a case-insensitive header map
//! - Extract status code and headers from an upstream response

use std::collections::HashMap;

use thiserror::Error;

/// Marks the end of the header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Errors produced while parsing HTTP message heads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// No bytes (or only blank lines) were received.
    #[error("empty request")]
    Empty,

    /// The request line did not have exactly method, target and version.
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// The status code in a response status line was not a number.
    #[error("malformed status line: {0:?}")]
    MalformedStatusLine(String),
}

/// Header map keyed by lowercased header name.
///
/// Later duplicates overwrite earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, lowercasing the name.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.inner.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse request-style header lines: split on the first `:`, trim both sides.
    fn from_request_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut headers = Self::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim(), value.trim());
            }
        }
        headers
    }
}

/// A parsed client request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub version: String,
    /// Header lines in arrival order, without line endings.
    pub header_lines: Vec<String>,
    pub headers: Headers,
}

impl Request {
    /// Parse a request head from raw bytes.
    ///
    /// The request line must split on whitespace into exactly three parts.
    /// Header lines run until the first blank line or the end of input.
    pub fn parse(raw: &[u8]) -> Result<Self, CodecError> {
        let text = String::from_utf8_lossy(raw);
        let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));

        let request_line = match lines.next() {
            Some(line) if !text.trim().is_empty() => line,
            _ => return Err(CodecError::Empty),
        };

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        let [method, target, version] = parts.as_slice() else {
            return Err(CodecError::MalformedRequestLine(request_line.to_string()));
        };

        let header_lines: Vec<String> = lines
            .take_while(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        let headers = Headers::from_request_lines(header_lines.iter().map(String::as_str));

        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
            header_lines,
            headers,
        })
    }

    /// Only GET and HEAD are served.
    pub fn is_supported_method(&self) -> bool {
        matches!(self.method.as_str(), "GET" | "HEAD")
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }
}

/// Status code and headers of an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// `0` when the status line has no code token.
    pub status: u16,
    pub status_line: String,
    pub headers: Headers,
}

/// Position just past the `\r\n\r\n` terminator, if present.
pub fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
        .map(|pos| pos + HEADER_TERMINATOR.len())
}

/// Parse the head of a raw upstream response.
///
/// Header lines are only recognised in `Name: value` form. A response without
/// a header terminator yields an empty header map.
pub fn parse_response_head(raw: &[u8]) -> Result<ResponseHead, CodecError> {
    let text = String::from_utf8_lossy(raw);
    let status_line = text.split("\r\n").next().unwrap_or_default().to_string();

    let status = match status_line.split_whitespace().nth(1) {
        Some(code) => code
            .parse::<u16>()
            .map_err(|_| CodecError::MalformedStatusLine(status_line.clone()))?,
        None => 0,
    };

    let mut headers = Headers::new();
    if let Some(end) = find_header_end(raw) {
        let head = String::from_utf8_lossy(&raw[..end]);
        for line in head.split("\r\n").skip(1) {
            if let Some((name, value)) = line.split_once(": ") {
                headers.insert(name, value);
            }
        }
    }

    Ok(ResponseHead {
        status,
        status_line,
        headers,
    })
}
