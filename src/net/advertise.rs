//! Advertise address validation.
//!
//! # Responsibilities
//! - Decide which address peers use to dial this node
//! - Reject non-TCP and wildcard addresses before the node joins a cluster
//!
//! # States
//! ```text
//! Advertiser (raw) ──validate──▶ Advertised (validated)
//!                  └──────────▶ TransportError (rejected)
//! ```
//!
//! Validation happens once. The result is immutable for the lifetime of the
//! stream layer that holds it.

use std::fmt;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// A network address as supplied by configuration or a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetAddr {
    /// A concrete TCP endpoint.
    Tcp(SocketAddr),
    /// A Unix domain socket path. Never dialable by the TCP stream layer.
    Unix(PathBuf),
}

impl From<SocketAddr> for NetAddr {
    fn from(addr: SocketAddr) -> Self {
        NetAddr::Tcp(addr)
    }
}

impl FromStr for NetAddr {
    type Err = AddrParseError;

    /// `unix:<path>` parses as [`NetAddr::Unix`], anything else must be an
    /// `ip:port` literal.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("unix:") {
            return Ok(NetAddr::Unix(PathBuf::from(path)));
        }
        s.parse::<SocketAddr>().map(NetAddr::Tcp)
    }
}

impl fmt::Display for NetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetAddr::Tcp(addr) => write!(f, "{}", addr),
            NetAddr::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Where the advertised address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrSource {
    /// Explicit advertise address.
    Configured,
    /// Derived from the listener's bound address.
    Listener,
}

/// A validated, dialable address to publish to peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advertised {
    addr: SocketAddr,
    source: AddrSource,
}

impl Advertised {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn source(&self) -> AddrSource {
        self.source
    }
}

/// Unvalidated advertise input.
#[derive(Debug, Clone)]
pub struct Advertiser {
    advertise: Option<NetAddr>,
    bound: SocketAddr,
    reject_unspecified: bool,
}

impl Advertiser {
    /// `bound` is the listener's local address, used when `advertise` is absent.
    pub fn new(advertise: Option<NetAddr>, bound: SocketAddr) -> Self {
        Self {
            advertise,
            bound,
            reject_unspecified: true,
        }
    }

    /// Toggle the wildcard check. The TCP type check always applies.
    pub fn reject_unspecified(mut self, enabled: bool) -> Self {
        self.reject_unspecified = enabled;
        self
    }

    /// Consume the raw input and produce a validated address or the reason it
    /// cannot be published.
    pub fn validate(self) -> Result<Advertised> {
        let (addr, source) = match self.advertise {
            Some(NetAddr::Tcp(addr)) => (addr, AddrSource::Configured),
            Some(other @ NetAddr::Unix(_)) => {
                return Err(TransportError::NotTcp { addr: other });
            }
            None => (self.bound, AddrSource::Listener),
        };

        // `to_canonical` folds `::ffff:0.0.0.0` into `0.0.0.0`.
        if self.reject_unspecified && addr.ip().to_canonical().is_unspecified() {
            return Err(TransportError::NotAdvertisable {
                addr: addr.to_string(),
            });
        }

        Ok(Advertised { addr, source })
    }
}
