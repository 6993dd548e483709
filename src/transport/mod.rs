//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! bind/advertise addresses + injected listener + TransportOptions
//!     → factory.rs (option checks, stream layer construction)
//!     → network.rs (NetworkTransport: accept loop, acquire/release)
//!     → pool.rs (idle outbound connections per peer)
//!     → RPC layer frames messages over the connections
//! ```
//!
//! # Design Decisions
//! - Dial must be reentrant: the pool dials several peers concurrently
//! - Closing one connection never affects another
//! - Pool eviction policy beyond the per-peer cap belongs to the RPC layer

pub mod factory;
pub mod network;
pub mod pool;

pub use factory::{new_tcp_transport, with_stream_layer, TransportOptions};
pub use network::NetworkTransport;
