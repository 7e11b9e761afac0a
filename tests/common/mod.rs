//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::TempDir;

use proxy_testbed::{OriginServer, ProxyServer, ServerHandle, TestbedConfig};

pub const TEST_HTML: &str = "<html><body>test</body></html>";
pub const SLOW_HTML: &str = "<html><body>slow</body></html>";

/// Upstream that answers every connection through a closure and records
/// the raw request it received.
pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
}

impl MockUpstream {
    /// Start a programmable upstream. The closure sees the raw request text.
    pub fn start<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Vec<u8> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&requests);
        let count = Arc::clone(&connections);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut socket) = stream else { break };
                count.fetch_add(1, Ordering::SeqCst);
                let request = read_head(&mut socket);
                let response = respond(&request);
                seen.lock().push(request);
                let _ = socket.write_all(&response);
                let _ = socket.shutdown(std::net::Shutdown::Both);
            }
        });

        Self {
            addr,
            requests,
            connections,
        }
    }

    /// Start an upstream that always sends the same bytes.
    pub fn fixed(response: &str) -> Self {
        let response = response.as_bytes().to_vec();
        Self::start(move |_| response.clone())
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// A full `Connection: close` response with a body.
pub fn http_response(status_line: &str, headers: &[(&str, &str)], body: &str) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {}\r\n", status_line);
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    ));
    out.into_bytes()
}

/// Read one request head (up to the blank line).
fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Send raw bytes on a fresh connection and read until the server closes.
pub fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(30))).unwrap();
    stream.write_all(request).unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    response
}

/// GET `url` through the proxy at `proxy`.
pub fn proxy_get(proxy: SocketAddr, url: &str) -> Vec<u8> {
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: ignored\r\nUser-Agent: testbed\r\n\r\n",
        url
    );
    send_raw(proxy, request.as_bytes())
}

pub fn status_line(response: &[u8]) -> String {
    let text = String::from_utf8_lossy(response);
    text.lines().next().unwrap_or_default().to_string()
}

pub fn body(response: &[u8]) -> Vec<u8> {
    match response.windows(4).position(|w| w == b"\r\n\r\n") {
        Some(pos) => response[pos + 4..].to_vec(),
        None => Vec::new(),
    }
}

/// Find a header value in a raw response, case-insensitively.
pub fn header(response: &[u8], name: &str) -> Option<String> {
    let text = String::from_utf8_lossy(response);
    let head = text.split("\r\n\r\n").next().unwrap_or_default();
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

/// A document root holding `test.html` and `slow.html`.
pub fn doc_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("test.html"), TEST_HTML).unwrap();
    std::fs::write(dir.path().join("slow.html"), SLOW_HTML).unwrap();
    dir
}

/// Loopback config on ephemeral ports with a small dispatch topology.
pub fn test_config(root: &TempDir) -> TestbedConfig {
    let mut config = TestbedConfig::default();
    config.proxy.bind_address = "127.0.0.1:0".to_string();
    config.origin.bind_address = "127.0.0.1:0".to_string();
    config.origin.document_root = root.path().to_path_buf();
    config.origin.slow_delay_ms = 500;
    config.dispatch.num_queues = 4;
    config.dispatch.threads_per_queue = 4;
    config
}

pub fn start_proxy(config: &TestbedConfig) -> ServerHandle {
    ProxyServer::bind(config).unwrap().spawn().unwrap()
}

pub fn start_origin(config: &TestbedConfig) -> ServerHandle {
    OriginServer::bind(config).unwrap().spawn().unwrap()
}

/// An address nothing is listening on.
pub fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}
