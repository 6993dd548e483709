//! Transport error taxonomy.
//!
//! # Classes
//! - Fatal (construction): `NotAdvertisable`, `NotTcp`, `InvalidOptions`. Node startup must abort.
//! - Transient (runtime): `DialTimeout`, `ConnectionRefused`, `NetworkUnreachable`, `Io`.
//!   Returned to the caller for retry; this layer never retries.
//! - Terminal (lifecycle): `ListenerClosed`. The accept loop stops.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::net::advertise::NetAddr;

/// Result alias used throughout the transport.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors produced by the stream layer and the transport built on it.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("address {addr} is not advertisable to peers")]
    NotAdvertisable { addr: String },

    #[error("address {addr} is not a TCP address")]
    NotTcp { addr: NetAddr },

    #[error("dial {address} timed out after {timeout:?}")]
    DialTimeout { address: String, timeout: Duration },

    #[error("connection to {address} refused")]
    ConnectionRefused {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("network unreachable for {address}")]
    NetworkUnreachable {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid transport options: {reason}")]
    InvalidOptions { reason: String },

    #[error("listener closed")]
    ListenerClosed,

    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Construction-time errors; the node must not join the cluster.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NotAdvertisable { .. } | Self::NotTcp { .. } | Self::InvalidOptions { .. }
        )
    }

    /// Runtime errors a connection pool may retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::DialTimeout { .. }
                | Self::ConnectionRefused { .. }
                | Self::NetworkUnreachable { .. }
                | Self::Io { .. }
        )
    }

    /// Intentional shutdown of the listener. Accept loops stop on this.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ListenerClosed)
    }

    /// Classify an I/O error from a dial attempt.
    pub(crate) fn from_dial(address: &str, timeout: Duration, err: io::Error) -> Self {
        let address = address.to_string();
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused { address, source: err },
            io::ErrorKind::NetworkUnreachable | io::ErrorKind::HostUnreachable => {
                Self::NetworkUnreachable { address, source: err }
            }
            io::ErrorKind::TimedOut => Self::DialTimeout { address, timeout },
            _ => Self::Io { op: "dial", source: err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_disjoint() {
        let fatal = TransportError::NotAdvertisable { addr: "0.0.0.0:1".into() };
        assert!(fatal.is_fatal() && !fatal.is_transient() && !fatal.is_terminal());

        let closed = TransportError::ListenerClosed;
        assert!(closed.is_terminal() && !closed.is_transient() && !closed.is_fatal());

        let timeout = TransportError::DialTimeout {
            address: "10.0.0.1:1".into(),
            timeout: Duration::from_millis(5),
        };
        assert!(timeout.is_transient() && !timeout.is_terminal());
    }

    #[test]
    fn dial_errors_map_by_kind() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(matches!(
            TransportError::from_dial("127.0.0.1:1", Duration::from_secs(1), refused),
            TransportError::ConnectionRefused { .. }
        ));

        let unreachable = io::Error::from(io::ErrorKind::NetworkUnreachable);
        assert!(matches!(
            TransportError::from_dial("10.255.0.1:1", Duration::from_secs(1), unreachable),
            TransportError::NetworkUnreachable { .. }
        ));

        let other = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(
            TransportError::from_dial("127.0.0.1:1", Duration::from_secs(1), other),
            TransportError::Io { op: "dial", .. }
        ));
    }
}
