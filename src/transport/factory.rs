//! Transport construction.
//!
//! # Responsibilities
//! - Check pool size and timeout
//! - Validate the advertise address by building the stream layer
//! - Hand the stream layer to a [`NetworkTransport`]
//!
//! # Design Decisions
//! - The listener is injected; the bind address is only used for diagnostics
//! - The log sink is one option: both variants share every code path

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::net::{ListenerHandle, NetAddr, StreamLayer, StreamLayerOptions, TcpStreamLayer};
use crate::observability::LogSink;
use crate::transport::network::NetworkTransport;

/// Pool, timeout, logging and stream layer settings for a transport.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Idle connections kept per peer. At least 1.
    pub max_pool: usize,
    /// Dial deadline. Must be non-zero.
    pub timeout: Duration,
    pub log_sink: LogSink,
    pub stream: StreamLayerOptions,
}

impl TransportOptions {
    pub fn new(max_pool: usize, timeout: Duration) -> Self {
        Self {
            max_pool,
            timeout,
            log_sink: LogSink::default(),
            stream: StreamLayerOptions::default(),
        }
    }

    pub fn with_log_sink(mut self, log_sink: LogSink) -> Self {
        self.log_sink = log_sink;
        self
    }

    pub fn with_stream_options(mut self, stream: StreamLayerOptions) -> Self {
        self.stream = stream;
        self
    }

    fn check(&self) -> Result<()> {
        if self.max_pool == 0 {
            return Err(TransportError::InvalidOptions {
                reason: "max_pool must be at least 1".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(TransportError::InvalidOptions {
                reason: "timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Build a transport over plain TCP on an injected listener.
///
/// Fails with [`TransportError::NotTcp`] or [`TransportError::NotAdvertisable`]
/// when the address peers would dial is unusable. The listener is not closed
/// on failure; it still belongs to the caller.
pub fn new_tcp_transport(
    bind_address: &str,
    advertise: Option<NetAddr>,
    options: TransportOptions,
    listener: ListenerHandle,
) -> Result<NetworkTransport> {
    options.check()?;
    let dispatch = options.log_sink.dispatch();

    let stream = tracing::dispatcher::with_default(&dispatch, || {
        let bound = listener.local_addr();
        match bind_address.parse::<SocketAddr>() {
            Ok(requested) if requested.port() != 0 && requested != bound => {
                tracing::warn!(bind_address, %bound, "Injected listener is not bound to the requested address");
            }
            _ => tracing::debug!(bind_address, %bound, "Using injected listener"),
        }
        TcpStreamLayer::new(listener, advertise, options.stream)
    })?;

    Ok(NetworkTransport::new(
        Arc::new(stream),
        options.max_pool,
        options.timeout,
        dispatch,
    ))
}

/// Build a transport over any stream layer.
pub fn with_stream_layer(
    stream: Arc<dyn StreamLayer>,
    options: TransportOptions,
) -> Result<NetworkTransport> {
    options.check()?;
    let dispatch = options.log_sink.dispatch();
    Ok(NetworkTransport::new(
        stream,
        options.max_pool,
        options.timeout,
        dispatch,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_zero_pool_and_timeout() {
        let listener = ListenerHandle::bind("127.0.0.1:0").await.unwrap();

        let err = new_tcp_transport(
            "127.0.0.1:0",
            None,
            TransportOptions::new(0, Duration::from_secs(1)),
            listener.clone(),
        )
        .unwrap_err();
        assert!(matches!(err, TransportError::InvalidOptions { .. }));

        let err = new_tcp_transport(
            "127.0.0.1:0",
            None,
            TransportOptions::new(1, Duration::ZERO),
            listener.clone(),
        )
        .unwrap_err();
        assert!(err.is_fatal());
        assert!(!listener.is_closed());
    }

    #[tokio::test]
    async fn rejected_advertise_leaves_listener_open() {
        let listener = ListenerHandle::bind("127.0.0.1:0").await.unwrap();
        let err = new_tcp_transport(
            "127.0.0.1:0",
            Some("0.0.0.0:9000".parse().unwrap()),
            TransportOptions::new(2, Duration::from_secs(1)),
            listener.clone(),
        )
        .unwrap_err();

        assert!(matches!(err, TransportError::NotAdvertisable { .. }));
        assert!(!listener.is_closed());
    }
}
