//! Stream transport for consensus cluster members.
//!
//! Exposes a reliable, addressable byte-stream channel between nodes for an
//! RPC layer that frames and dispatches consensus messages.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod transport;

pub use config::NodeConfig;
pub use error::{Result, TransportError};
pub use net::{Connection, ListenerHandle, NetAddr, StreamLayer, StreamLayerOptions, TcpStreamLayer};
pub use observability::LogSink;
pub use transport::{new_tcp_transport, NetworkTransport, TransportOptions};
