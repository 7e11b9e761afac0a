//! Static file handling with conditional GET.
//!
//! # Responsibilities
//! - Parse the request from a single read
//! - Gate methods (GET/HEAD only)
//! - Resolve the target under the document root
//! - Delay the configured slow resource
//! - Answer 304 when `If-Modified-Since` is not older than the file

use std::fs;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::config::OriginConfig;
use crate::http::{Request, Response, StatusCode};
use crate::observability::metrics;

/// Failures while serving a file.
#[derive(Debug, Error)]
pub enum OriginError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Serves files from a document root.
#[derive(Debug, Clone)]
pub struct OriginHandler {
    document_root: PathBuf,
    default_resource: String,
    slow_path: String,
    slow_delay: Duration,
    read_buffer_size: usize,
}

impl OriginHandler {
    pub fn new(config: &OriginConfig) -> Self {
        Self {
            document_root: config.document_root.clone(),
            default_resource: config.default_resource.clone(),
            slow_path: config.slow_path.clone(),
            slow_delay: config.slow_delay(),
            read_buffer_size: config.read_buffer_size,
        }
    }

    /// Serve one request on `stream`. The caller closes the connection.
    pub fn handle<S: Read + Write>(&self, stream: &mut S, peer: SocketAddr) {
        let mut buf = vec![0u8; self.read_buffer_size];
        let outcome = stream.read(&mut buf).map(|n| {
            tracing::debug!(peer_addr = %peer, bytes = n, "Received request");
            self.respond(&buf[..n])
        });

        let bytes = match outcome {
            Ok((response, include_body)) => {
                tracing::info!(
                    peer_addr = %peer,
                    status = response.status.as_u16(),
                    "Responding"
                );
                metrics::record_origin_response(response.status.as_u16());
                response.to_bytes(include_body)
            }
            Err(e) => {
                tracing::error!(peer_addr = %peer, error = %e, "Error reading request");
                metrics::record_origin_response(500);
                Response::new(StatusCode::InternalServerError).to_bytes(false)
            }
        };

        if let Err(e) = stream.write_all(&bytes).and_then(|_| stream.flush()) {
            tracing::warn!(peer_addr = %peer, error = %e, "Failed to send response");
        }
    }

    /// Build the response for a raw request.
    ///
    /// The flag tells whether the body goes on the wire (false for HEAD).
    pub fn respond(&self, raw: &[u8]) -> (Response, bool) {
        let request = match Request::parse(raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "Bad request");
                return (Response::new(StatusCode::BadRequest), false);
            }
        };

        if !request.is_supported_method() {
            return (Response::new(StatusCode::NotImplemented), false);
        }

        match self.serve_file(&request) {
            Ok(response) => (response, !request.is_head()),
            Err(e) => {
                tracing::error!(error = %e, path = %request.target, "Error handling request");
                (Response::new(StatusCode::InternalServerError), false)
            }
        }
    }

    fn serve_file(&self, request: &Request) -> Result<Response, OriginError> {
        let path = request_path(&request.target);
        let path = if path == "/" {
            self.default_resource.as_str()
        } else {
            path
        };

        if path == self.slow_path {
            tracing::info!(delay_ms = self.slow_delay.as_millis() as u64, "Simulating slow response");
            thread::sleep(self.slow_delay);
        }

        let Some(file_path) = self.resolve(path) else {
            return Ok(Response::new(StatusCode::NotFound));
        };
        let Ok(metadata) = fs::metadata(&file_path) else {
            return Ok(Response::new(StatusCode::NotFound));
        };
        if !metadata.is_file() {
            return Ok(Response::new(StatusCode::NotFound));
        }

        let read_err = |source| OriginError::Read {
            path: file_path.clone(),
            source,
        };
        let modified = truncate_to_seconds(metadata.modified().map_err(read_err)?);
        let last_modified = httpdate::fmt_http_date(modified);

        if let Some(since) = request.headers.get("if-modified-since") {
            match httpdate::parse_http_date(since) {
                Ok(since) if modified <= since => {
                    tracing::debug!(file = %file_path.display(), "Not modified since client copy");
                    return Ok(Response::new(StatusCode::NotModified)
                        .header("Last-Modified", last_modified));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(value = since, error = %e, "Ignoring unparseable If-Modified-Since");
                }
            }
        }

        let content = fs::read(&file_path).map_err(read_err)?;
        Ok(Response::new(StatusCode::Ok)
            .header("Date", httpdate::fmt_http_date(SystemTime::now()))
            .header("Last-Modified", last_modified)
            .header("Content-Length", content.len().to_string())
            .header("Connection", "close")
            .body(content))
    }

    /// Map a request path onto the document root. Rejects `..` and prefixes.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.document_root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(resolved)
    }
}

/// Drop any query string.
fn request_path(target: &str) -> &str {
    target.split_once('?').map_or(target, |(path, _)| path)
}

/// HTTP dates have one-second resolution.
fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, OriginHandler) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("test.html"), b"<h1>test</h1>").unwrap();
        fs::write(dir.path().join("slow.html"), b"<h1>slow</h1>").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let config = OriginConfig {
            document_root: dir.path().to_path_buf(),
            slow_delay_ms: 200,
            ..OriginConfig::default()
        };
        (dir, OriginHandler::new(&config))
    }

    fn mtime(dir: &TempDir, name: &str) -> SystemTime {
        truncate_to_seconds(fs::metadata(dir.path().join(name)).unwrap().modified().unwrap())
    }

    #[test]
    fn get_serves_file_with_headers() {
        let (_dir, handler) = fixture();
        let (res, include_body) = handler.respond(b"GET /test.html HTTP/1.1\r\n\r\n");
        assert_eq!(res.status, StatusCode::Ok);
        assert!(include_body);
        assert_eq!(res.body, b"<h1>test</h1>");
        assert_eq!(res.header_value("Content-Length"), Some("13"));
        assert_eq!(res.header_value("Connection"), Some("close"));
        assert!(res.header_value("Date").is_some());
        assert!(res.header_value("Last-Modified").is_some());
    }

    #[test]
    fn root_maps_to_default_resource() {
        let (_dir, handler) = fixture();
        let (res, _) = handler.respond(b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(res.body, b"<h1>test</h1>");
    }

    #[test]
    fn query_string_is_ignored() {
        let (_dir, handler) = fixture();
        let (res, _) = handler.respond(b"GET /test.html?v=2 HTTP/1.1\r\n\r\n");
        assert_eq!(res.status, StatusCode::Ok);
    }

    #[test]
    fn head_has_get_headers_but_no_body() {
        let (_dir, handler) = fixture();
        let (get, _) = handler.respond(b"GET /test.html HTTP/1.1\r\n\r\n");
        let (head, include_body) = handler.respond(b"HEAD /test.html HTTP/1.1\r\n\r\n");
        assert!(!include_body);
        assert_eq!(head.header_value("Content-Length"), get.header_value("Content-Length"));
        assert_eq!(head.header_value("Last-Modified"), get.header_value("Last-Modified"));
        assert!(head.to_bytes(include_body).ends_with(b"\r\n\r\n"));
    }

    #[test]
    fn missing_file_and_directory_are_404() {
        let (_dir, handler) = fixture();
        assert_eq!(handler.respond(b"GET /nope.html HTTP/1.1\r\n\r\n").0.status, StatusCode::NotFound);
        assert_eq!(handler.respond(b"GET /sub HTTP/1.1\r\n\r\n").0.status, StatusCode::NotFound);
    }

    #[test]
    fn traversal_is_404() {
        let (_dir, handler) = fixture();
        let (res, _) = handler.respond(b"GET /../etc/passwd HTTP/1.1\r\n\r\n");
        assert_eq!(res.status, StatusCode::NotFound);
    }

    #[test]
    fn bad_requests() {
        let (_dir, handler) = fixture();
        assert_eq!(handler.respond(b"").0.status, StatusCode::BadRequest);
        assert_eq!(handler.respond(b"GET\r\n\r\n").0.status, StatusCode::BadRequest);
        assert_eq!(
            handler.respond(b"POST /test.html HTTP/1.1\r\n\r\n").0.status,
            StatusCode::NotImplemented
        );
    }

    #[test]
    fn if_modified_since_at_or_after_mtime_is_304() {
        let (dir, handler) = fixture();
        let modified = mtime(&dir, "test.html");

        for since in [modified, modified + Duration::from_secs(60)] {
            let raw = format!(
                "GET /test.html HTTP/1.1\r\nIf-Modified-Since: {}\r\n\r\n",
                httpdate::fmt_http_date(since)
            );
            let (res, _) = handler.respond(raw.as_bytes());
            assert_eq!(res.status, StatusCode::NotModified);
            assert!(res.body.is_empty());
            assert_eq!(res.header_value("Last-Modified"), Some(httpdate::fmt_http_date(modified).as_str()));
        }
    }

    #[test]
    fn if_modified_since_before_mtime_is_200() {
        let (dir, handler) = fixture();
        let earlier = mtime(&dir, "test.html") - Duration::from_secs(1);
        let raw = format!(
            "GET /test.html HTTP/1.1\r\nif-modified-since: {}\r\n\r\n",
            httpdate::fmt_http_date(earlier)
        );
        let (res, _) = handler.respond(raw.as_bytes());
        assert_eq!(res.status, StatusCode::Ok);
        assert_eq!(res.body, b"<h1>test</h1>");
    }

    #[test]
    fn unparseable_if_modified_since_is_ignored() {
        let (_dir, handler) = fixture();
        let (res, _) = handler.respond(b"GET /test.html HTTP/1.1\r\nIf-Modified-Since: last tuesday\r\n\r\n");
        assert_eq!(res.status, StatusCode::Ok);
    }

    #[test]
    fn slow_resource_is_delayed() {
        let (_dir, handler) = fixture();
        let start = std::time::Instant::now();
        let (res, _) = handler.respond(b"GET /slow.html HTTP/1.1\r\n\r\n");
        assert_eq!(res.status, StatusCode::Ok);
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn handle_writes_serialized_response() {
        let (_dir, handler) = fixture();
        let mut stream = Duplex {
            input: Cursor::new(b"HEAD /test.html HTTP/1.1\r\n\r\n".to_vec()),
            output: Vec::new(),
        };
        handler.handle(&mut stream, "127.0.0.1:1".parse().unwrap());

        let text = String::from_utf8(stream.output).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }
}
