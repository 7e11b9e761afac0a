//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities, pool sizes, buffers > 0)
//! - Check that listen addresses have a host and a numeric port
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TestbedConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::TestbedConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &TestbedConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind_address("proxy.bind_address", &config.proxy.bind_address, &mut errors);
    check_bind_address("origin.bind_address", &config.origin.bind_address, &mut errors);

    if config.proxy.buffer_size == 0 {
        errors.push(ValidationError::new("proxy.buffer_size", "must be greater than zero"));
    }
    if config.cache.capacity == 0 {
        errors.push(ValidationError::new("cache.capacity", "must be greater than zero"));
    }
    if config.origin.read_buffer_size == 0 {
        errors.push(ValidationError::new(
            "origin.read_buffer_size",
            "must be greater than zero",
        ));
    }
    if !config.origin.default_resource.starts_with('/') {
        errors.push(ValidationError::new(
            "origin.default_resource",
            "must start with '/'",
        ));
    }
    if config.dispatch.num_queues == 0 {
        errors.push(ValidationError::new("dispatch.num_queues", "must be greater than zero"));
    }
    if config.dispatch.threads_per_queue == 0 {
        errors.push(ValidationError::new(
            "dispatch.threads_per_queue",
            "must be greater than zero",
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Accepts `host:port` where host may be a name; resolution happens at bind time.
fn check_bind_address(field: &'static str, address: &str, errors: &mut Vec<ValidationError>) {
    match address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
        _ => errors.push(ValidationError::new(
            field,
            format!("expected host:port, got {:?}", address),
        )),
    }
}
