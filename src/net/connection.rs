//! Peer connections.
//!
//! # Responsibilities
//! - Wrap a TCP stream produced by `dial` or `accept`
//! - Give every connection a unique ID for tracing
//! - Track open connections in metrics
//!
//! Each [`Connection`] owns its stream exclusively; shutting one down never
//! touches another.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;

use crate::observability::metrics;

/// Process-wide ID source. Relaxed: IDs only need to be unique.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Which side produced the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
        }
    }
}

/// An established byte stream to a peer.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    direction: Direction,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    stream: TcpStream,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, direction: Direction) -> io::Result<Self> {
        let local_addr = stream.local_addr()?;
        let peer_addr = stream.peer_addr()?;
        // Consensus RPCs are small and latency bound.
        stream.set_nodelay(true)?;

        let id = ConnectionId::new();
        metrics::connection_opened(direction.as_str());
        tracing::trace!(connection_id = %id, direction = direction.as_str(), peer = %peer_addr, "Connection opened");

        Ok(Self {
            id,
            direction,
            local_addr,
            peer_addr,
            stream,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Flush and shut down the write half, then drop the stream.
    pub async fn close(mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        metrics::connection_closed(self.direction.as_str());
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("conn-"));
    }

    #[tokio::test]
    async fn closing_one_connection_leaves_other_intact() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let a = Connection::new(TcpStream::connect(addr).await.unwrap(), Direction::Outbound).unwrap();
        let (mut server_a, _) = listener.accept().await.unwrap();
        let mut b =
            Connection::new(TcpStream::connect(addr).await.unwrap(), Direction::Outbound).unwrap();
        let (mut server_b, _) = listener.accept().await.unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(a.peer_addr(), addr);

        a.close().await.unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(server_a.read(&mut buf).await.unwrap(), 0);

        b.write_all(b"x").await.unwrap();
        server_b.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"x");
    }
}
