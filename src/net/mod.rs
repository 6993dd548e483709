//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Listener owner binds socket
//!     → listener.rs (ListenerHandle, injected capability)
//!     → advertise.rs (validate the address peers will dial)
//!     → stream_layer.rs (dial / accept / close / addr)
//!     → connection.rs (per-connection identity, byte stream)
//!     → Hand off to the network transport
//! ```
//!
//! # Design Decisions
//! - The listener is never bound or torn down by the stream layer
//! - Advertise validation runs once, at construction
//! - Accept is cancelled only by closing the listener

pub mod advertise;
pub mod connection;
pub mod listener;
pub mod stream_layer;

pub use advertise::{AddrSource, Advertised, Advertiser, NetAddr};
pub use connection::{Connection, ConnectionId, Direction};
pub use listener::ListenerHandle;
pub use stream_layer::{StreamLayer, StreamLayerOptions, TcpStreamLayer};
