//! Metrics collection and exposition.
//!
//! # Metrics
//! - `raft_transport_dials_total` (counter): outbound dial attempts
//! - `raft_transport_dial_failures_total` (counter): failed dials by `kind`
//! - `raft_transport_accepts_total` (counter): inbound connections accepted
//! - `raft_transport_open_connections` (gauge): live connections by `direction`
//! - `raft_transport_pooled_connections` (gauge): idle connections held for reuse
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exposition is opt-in through config

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::TransportError;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn dial_attempted() {
    metrics::counter!("raft_transport_dials_total").increment(1);
}

pub fn dial_failed(err: &TransportError) {
    let kind = match err {
        TransportError::DialTimeout { .. } => "timeout",
        TransportError::ConnectionRefused { .. } => "refused",
        TransportError::NetworkUnreachable { .. } => "unreachable",
        _ => "other",
    };
    metrics::counter!("raft_transport_dial_failures_total", "kind" => kind).increment(1);
}

pub fn connection_accepted() {
    metrics::counter!("raft_transport_accepts_total").increment(1);
}

pub fn connection_opened(direction: &'static str) {
    metrics::gauge!("raft_transport_open_connections", "direction" => direction).increment(1.0);
}

pub fn connection_closed(direction: &'static str) {
    metrics::gauge!("raft_transport_open_connections", "direction" => direction).decrement(1.0);
}

pub fn pooled_connections(count: usize) {
    metrics::gauge!("raft_transport_pooled_connections").set(count as f64);
}
