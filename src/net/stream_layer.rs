//! Stream layer: dial, accept, close and address resolution over TCP.
//!
//! # Contract
//! - `dial` may be called concurrently; each call yields an independent
//!   connection and shares no mutable state with other calls.
//! - `accept` is driven by a single sequential loop. Two concurrent calls are
//!   a caller error and are not guarded against.
//! - `accept` has no timeout. It returns [`TransportError::ListenerClosed`]
//!   once the listener's owner closes it; callers must stop looping on that.
//! - `close` is idempotent and leaves the injected listener open unless the
//!   layer was built to own it.
//! - `addr` never re-validates; the address was checked at construction.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::{Result, TransportError};
use crate::net::advertise::{Advertised, Advertiser, NetAddr};
use crate::net::connection::{Connection, Direction};
use crate::net::listener::ListenerHandle;
use crate::observability::metrics;

/// Byte-stream capability consumed by the network transport.
#[async_trait]
pub trait StreamLayer: Send + Sync + fmt::Debug {
    /// Open an outbound connection to `address` within `timeout`.
    async fn dial(&self, address: &str, timeout: Duration) -> Result<Connection>;

    /// Wait for the next inbound connection.
    async fn accept(&self) -> Result<Connection>;

    /// Release this layer's resources.
    async fn close(&self) -> Result<()>;

    /// The address peers should dial.
    fn addr(&self) -> SocketAddr;
}

/// Construction flags for [`TcpStreamLayer`].
#[derive(Debug, Clone, Copy)]
pub struct StreamLayerOptions {
    /// Reject wildcard advertise addresses. Defaults to `true`.
    pub validate_advertise_address: bool,
    /// Close the injected listener on [`StreamLayer::close`]. Defaults to `false`.
    pub owns_listener: bool,
}

impl Default for StreamLayerOptions {
    fn default() -> Self {
        Self {
            validate_advertise_address: true,
            owns_listener: false,
        }
    }
}

/// Plain TCP implementation of [`StreamLayer`].
#[derive(Debug)]
pub struct TcpStreamLayer {
    listener: ListenerHandle,
    advertised: Advertised,
    owns_listener: bool,
    closed: AtomicBool,
}

impl TcpStreamLayer {
    /// Wrap an injected listener, validating the advertise address once.
    pub fn new(
        listener: ListenerHandle,
        advertise: Option<NetAddr>,
        options: StreamLayerOptions,
    ) -> Result<Self> {
        let advertised = Advertiser::new(advertise, listener.local_addr())
            .reject_unspecified(options.validate_advertise_address)
            .validate()
            .inspect_err(|err| {
                tracing::error!(bound = %listener.local_addr(), error = %err, "Advertise address rejected");
            })?;

        tracing::debug!(
            advertise = %advertised.addr(),
            source = ?advertised.source(),
            owns_listener = options.owns_listener,
            "Stream layer ready"
        );

        Ok(Self {
            listener,
            advertised,
            owns_listener: options.owns_listener,
            closed: AtomicBool::new(false),
        })
    }

    /// The injected listener.
    pub fn listener(&self) -> &ListenerHandle {
        &self.listener
    }

    pub fn advertised(&self) -> Advertised {
        self.advertised
    }
}

#[async_trait]
impl StreamLayer for TcpStreamLayer {
    async fn dial(&self, address: &str, timeout: Duration) -> Result<Connection> {
        metrics::dial_attempted();

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                let err = TransportError::from_dial(address, timeout, err);
                metrics::dial_failed(&err);
                tracing::debug!(%address, error = %err, "Dial failed");
                return Err(err);
            }
            Err(_) => {
                let err = TransportError::DialTimeout {
                    address: address.to_string(),
                    timeout,
                };
                metrics::dial_failed(&err);
                tracing::debug!(%address, ?timeout, "Dial timed out");
                return Err(err);
            }
        };

        Connection::new(stream, Direction::Outbound).map_err(|source| TransportError::Io { op: "dial", source })
    }

    async fn accept(&self) -> Result<Connection> {
        let (stream, peer) = self.listener.accept().await?;
        metrics::connection_accepted();
        tracing::debug!(peer_addr = %peer, "Connection accepted");
        Connection::new(stream, Direction::Inbound).map_err(|source| TransportError::Io { op: "accept", source })
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if self.owns_listener {
            self.listener.close().await;
        }
        tracing::debug!(advertise = %self.advertised.addr(), "Stream layer closed");
        Ok(())
    }

    fn addr(&self) -> SocketAddr {
        self.advertised.addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dial_refused_is_transient() {
        let listener = ListenerHandle::bind("127.0.0.1:0").await.unwrap();
        let layer = TcpStreamLayer::new(listener, None, StreamLayerOptions::default()).unwrap();

        // Bind and drop to find a port with nothing listening.
        let free = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();

        let err = layer
            .dial(&free.to_string(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionRefused { .. }), "{err}");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn owning_layer_closes_listener_once() {
        let listener = ListenerHandle::bind("127.0.0.1:0").await.unwrap();
        let layer = TcpStreamLayer::new(
            listener.clone(),
            None,
            StreamLayerOptions {
                owns_listener: true,
                ..Default::default()
            },
        )
        .unwrap();

        layer.close().await.unwrap();
        layer.close().await.unwrap();
        assert!(listener.is_closed());
    }

    #[tokio::test]
    async fn wildcard_bind_rejected_unless_check_disabled() {
        let listener = ListenerHandle::bind("0.0.0.0:0").await.unwrap();

        let err = TcpStreamLayer::new(listener.clone(), None, StreamLayerOptions::default()).unwrap_err();
        assert!(matches!(err, TransportError::NotAdvertisable { .. }));

        let layer = TcpStreamLayer::new(
            listener.clone(),
            None,
            StreamLayerOptions {
                validate_advertise_address: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(layer.addr(), listener.local_addr());
    }
}
