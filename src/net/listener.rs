//! Externally owned TCP listener.
//!
//! # Responsibilities
//! - Wrap an already-bound socket so it can be injected into a stream layer
//! - Let the owner close it, unblocking any pending `accept`
//!
//! # Ownership
//! Whoever creates a [`ListenerHandle`] owns it. Clones handed to a stream
//! layer share the socket but the stream layer does not close it unless it
//! was explicitly configured to own it.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, RwLock};

use crate::error::{Result, TransportError};

#[derive(Debug)]
struct Shared {
    /// `None` once closed, releasing the socket.
    socket: RwLock<Option<TcpListener>>,
    local_addr: SocketAddr,
    closed: watch::Sender<bool>,
}

/// A cloneable capability over a bound TCP listener.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    shared: Arc<Shared>,
}

impl ListenerHandle {
    /// Bind a fresh listener. Intended for the listener owner; the stream
    /// layer never calls this.
    pub async fn bind(bind_address: &str) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)
            .await
            .map_err(|source| TransportError::Io { op: "bind", source })?;
        Self::from_tokio(listener)
    }

    /// Adopt a std listener whose socket options the caller already set.
    pub fn from_std(listener: std::net::TcpListener) -> Result<Self> {
        listener
            .set_nonblocking(true)
            .map_err(|source| TransportError::Io { op: "bind", source })?;
        let listener =
            TcpListener::from_std(listener).map_err(|source| TransportError::Io { op: "bind", source })?;
        Self::from_tokio(listener)
    }

    /// Adopt an already-bound tokio listener.
    pub fn from_tokio(listener: TcpListener) -> Result<Self> {
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Io { op: "bind", source })?;

        tracing::info!(address = %local_addr, "Listener bound");

        let (closed, _) = watch::channel(false);
        Ok(Self {
            shared: Arc::new(Shared {
                socket: RwLock::new(Some(listener)),
                local_addr,
                closed,
            }),
        })
    }

    /// The address the socket is bound to. Stable after close.
    pub fn local_addr(&self) -> SocketAddr {
        self.shared.local_addr
    }

    /// Wait for the next inbound connection.
    ///
    /// Blocks without a timeout. Returns [`TransportError::ListenerClosed`] as
    /// soon as [`close`](Self::close) is called, including when the call is
    /// already waiting.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let mut closed = self.shared.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(TransportError::ListenerClosed);
        }

        let guard = self.shared.socket.read().await;
        let Some(listener) = guard.as_ref() else {
            return Err(TransportError::ListenerClosed);
        };

        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => Err(TransportError::ListenerClosed),
            accepted = listener.accept() => {
                accepted.map_err(|source| TransportError::Io { op: "accept", source })
            }
        }
    }

    /// Close the listener. Idempotent.
    pub async fn close(&self) {
        let first = self.shared.closed.send_if_modified(|closed| {
            let was_open = !*closed;
            *closed = true;
            was_open
        });
        if !first {
            return;
        }

        // Pending accepts observe the signal and drop their read guards.
        self.shared.socket.write().await.take();
        tracing::info!(address = %self.shared.local_addr, "Listener closed");
    }

    pub fn is_closed(&self) -> bool {
        *self.shared.closed.borrow()
    }
}
