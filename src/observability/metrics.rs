//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_cache_hits_total` / `proxy_cache_misses_total` (counter)
//! - `proxy_cache_expired_total` (counter): entries dropped by lazy expiry
//! - `proxy_cache_evictions_total` (counter): entries dropped for capacity
//! - `proxy_cache_inserts_total` (counter)
//! - `proxy_cache_entries` (gauge)
//! - `proxy_revalidations_total` (counter): by outcome
//! - `proxy_requests_total` / `origin_requests_total` (counter): by status
//! - `dispatch_enqueued_total` (counter): by queue
//! - `active_connections` (gauge): by service
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_cache_hit() {
    metrics::counter!("proxy_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    metrics::counter!("proxy_cache_misses_total").increment(1);
}

pub fn record_cache_expired() {
    metrics::counter!("proxy_cache_expired_total").increment(1);
}

pub fn record_cache_eviction() {
    metrics::counter!("proxy_cache_evictions_total").increment(1);
}

pub fn record_cache_insert(entries: usize) {
    metrics::counter!("proxy_cache_inserts_total").increment(1);
    record_cache_size(entries);
}

pub fn record_cache_size(entries: usize) {
    metrics::gauge!("proxy_cache_entries").set(entries as f64);
}

/// `outcome` is `not_modified` or `refreshed`.
pub fn record_revalidation(outcome: &'static str) {
    metrics::counter!("proxy_revalidations_total", "outcome" => outcome).increment(1);
}

pub fn record_proxy_response(status: u16) {
    metrics::counter!("proxy_requests_total", "status" => status.to_string()).increment(1);
}

pub fn record_origin_response(status: u16) {
    metrics::counter!("origin_requests_total", "status" => status.to_string()).increment(1);
}

pub fn record_enqueued(queue: usize) {
    metrics::counter!("dispatch_enqueued_total", "queue" => queue.to_string()).increment(1);
}

pub fn record_active_connections(service: &'static str, count: u64) {
    metrics::gauge!("active_connections", "service" => service).set(count as f64);
}
