//! Origin server behaviour over real sockets, including queue isolation.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use proxy_testbed::config::DispatchConfig;
use proxy_testbed::net::{ConnectionTracker, Listener};
use proxy_testbed::origin::{connection_handler, Connection, OriginHandler};
use proxy_testbed::DispatchFabric;

mod common;
use common::{body, header, send_raw, status_line};

#[test]
fn get_serves_file_with_validators() {
    let root = common::doc_root();
    let origin = common::start_origin(&common::test_config(&root));

    let response = send_raw(origin.local_addr(), b"GET /test.html HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    assert_eq!(body(&response), common::TEST_HTML.as_bytes());
    assert_eq!(
        header(&response, "Content-Length"),
        Some(common::TEST_HTML.len().to_string())
    );
    assert!(header(&response, "Date").is_some());
    assert!(header(&response, "Last-Modified").is_some());
    assert_eq!(header(&response, "Connection").as_deref(), Some("close"));

    origin.shutdown();
}

#[test]
fn root_maps_to_default_resource() {
    let root = common::doc_root();
    let origin = common::start_origin(&common::test_config(&root));

    let response = send_raw(origin.local_addr(), b"GET / HTTP/1.1\r\n\r\n");
    assert_eq!(body(&response), common::TEST_HTML.as_bytes());

    origin.shutdown();
}

#[test]
fn head_omits_body() {
    let root = common::doc_root();
    let origin = common::start_origin(&common::test_config(&root));

    let response = send_raw(origin.local_addr(), b"HEAD /test.html HTTP/1.1\r\n\r\n");
    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    assert_eq!(
        header(&response, "Content-Length"),
        Some(common::TEST_HTML.len().to_string())
    );
    assert!(body(&response).is_empty());

    origin.shutdown();
}

#[test]
fn if_modified_since_yields_304_until_file_changes() {
    let root = common::doc_root();
    let origin = common::start_origin(&common::test_config(&root));

    let first = send_raw(origin.local_addr(), b"GET /test.html HTTP/1.1\r\n\r\n");
    let last_modified = header(&first, "Last-Modified").unwrap();

    let conditional = format!(
        "GET /test.html HTTP/1.1\r\nIf-Modified-Since: {}\r\n\r\n",
        last_modified
    );
    let response = send_raw(origin.local_addr(), conditional.as_bytes());
    assert_eq!(status_line(&response), "HTTP/1.1 304 Not Modified");
    assert_eq!(header(&response, "Last-Modified"), Some(last_modified));
    assert!(body(&response).is_empty());

    let stale = "GET /test.html HTTP/1.1\r\nIf-Modified-Since: Thu, 01 Jan 1970 00:00:00 GMT\r\n\r\n";
    let response = send_raw(origin.local_addr(), stale.as_bytes());
    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");

    origin.shutdown();
}

#[test]
fn error_statuses() {
    let root = common::doc_root();
    std::fs::create_dir(root.path().join("dir")).unwrap();
    let origin = common::start_origin(&common::test_config(&root));
    let addr = origin.local_addr();

    let cases = [
        ("GET /nope.html HTTP/1.1\r\n\r\n", "HTTP/1.1 404 Not Found"),
        ("GET /dir HTTP/1.1\r\n\r\n", "HTTP/1.1 404 Not Found"),
        ("GET /../test.html HTTP/1.1\r\n\r\n", "HTTP/1.1 404 Not Found"),
        ("DELETE /test.html HTTP/1.1\r\n\r\n", "HTTP/1.1 501 Not Implemented"),
        ("GET\r\n\r\n", "HTTP/1.1 400 Bad Request"),
    ];
    for (request, expected) in cases {
        assert_eq!(status_line(&send_raw(addr, request.as_bytes())), expected);
    }

    origin.shutdown();
}

#[test]
fn slow_resource_is_delayed() {
    let root = common::doc_root();
    let origin = common::start_origin(&common::test_config(&root));

    let start = Instant::now();
    let response = send_raw(origin.local_addr(), b"GET /slow.html HTTP/1.1\r\n\r\n");
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert_eq!(body(&response), common::SLOW_HTML.as_bytes());

    origin.shutdown();
}

#[test]
fn concurrent_clients_are_all_served() {
    let root = common::doc_root();
    let origin = common::start_origin(&common::test_config(&root));
    let addr = origin.local_addr();

    let clients: Vec<_> = (0..32)
        .map(|_| thread::spawn(move || send_raw(addr, b"GET /test.html HTTP/1.1\r\n\r\n")))
        .collect();
    for client in clients {
        let response = client.join().unwrap();
        assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    }

    origin.shutdown();
}

/// Send a slow request on queue 0, then a fast request on `fast_queue`, and
/// return how long the fast client waited.
fn fast_latency_behind_slow(dispatch: DispatchConfig, fast_queue: usize) -> Duration {
    let root = common::doc_root();
    let config = common::test_config(&root);
    let handler = Arc::new(OriginHandler::new(&config.origin));
    let fabric = DispatchFabric::start(
        &dispatch,
        connection_handler(handler, ConnectionTracker::new("origin")),
    )
    .unwrap();
    let listener = Listener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr();

    let slow = thread::spawn(move || send_raw(addr, b"GET /slow.html HTTP/1.1\r\n\r\n"));
    let (stream, peer, id) = listener.accept().unwrap();
    fabric.enqueue_to(0, Connection { stream, peer, id }).unwrap();

    // let the slow job reach its worker
    thread::sleep(Duration::from_millis(50));

    let fast = thread::spawn(move || {
        let start = Instant::now();
        let response = send_raw(addr, b"GET /test.html HTTP/1.1\r\n\r\n");
        (start.elapsed(), response)
    });
    let (stream, peer, id) = listener.accept().unwrap();
    fabric.enqueue_to(fast_queue, Connection { stream, peer, id }).unwrap();

    let (elapsed, response) = fast.join().unwrap();
    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    assert_eq!(status_line(&slow.join().unwrap()), "HTTP/1.1 200 OK");

    fabric.shutdown();
    elapsed
}

#[test]
fn slow_request_does_not_block_other_queues() {
    let elapsed = fast_latency_behind_slow(
        DispatchConfig {
            num_queues: 2,
            threads_per_queue: 1,
        },
        1,
    );
    assert!(elapsed < Duration::from_millis(300), "fast request took {:?}", elapsed);
}

#[test]
fn slow_request_blocks_its_own_queue() {
    let elapsed = fast_latency_behind_slow(
        DispatchConfig {
            num_queues: 1,
            threads_per_queue: 1,
        },
        0,
    );
    assert!(elapsed >= Duration::from_millis(400), "fast request took {:?}", elapsed);
}

#[test]
fn shutdown_stops_accepting() {
    let root = common::doc_root();
    let origin = common::start_origin(&common::test_config(&root));
    let addr = origin.local_addr();

    assert_eq!(
        status_line(&send_raw(addr, b"GET /test.html HTTP/1.1\r\n\r\n")),
        "HTTP/1.1 200 OK"
    );
    origin.shutdown();

    assert!(std::net::TcpStream::connect(addr).is_err());
}
