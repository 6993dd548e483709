//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool size, timeout > 0, ports valid)
//! - Check addresses parse before any socket is touched
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NodeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::NodeConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
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

/// Validate a parsed configuration.
pub fn validate_config(config: &NodeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let transport = &config.transport;

    if !is_host_port(&transport.bind_address) {
        errors.push(ValidationError::new(
            "transport.bind_address",
            format!("expected host:port, got {:?}", transport.bind_address),
        ));
    }

    if let Err(e) = transport.advertise() {
        errors.push(ValidationError::new(
            "transport.advertise_address",
            format!("expected ip:port or unix:<path>: {}", e),
        ));
    }

    if transport.max_pool == 0 {
        errors.push(ValidationError::new("transport.max_pool", "must be at least 1"));
    }

    if transport.timeout_ms == 0 {
        errors.push(ValidationError::new("transport.timeout_ms", "must be greater than 0"));
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ValidationError::new(
            "logging.level",
            format!("unknown level {:?}", config.logging.level),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("expected ip:port, got {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` with a non-empty host and a numeric port.
fn is_host_port(addr: &str) -> bool {
    match addr.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
