//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     close() on transport → trigger → accept loop exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → node binary closes transport, then listener
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept loop, close stream layer, drop pooled connections
//! - The listener is closed last and only by its owner

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
