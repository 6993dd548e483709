//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Stream layer and transport produce:
//!     → logging.rs (structured log events, routed by LogSink)
//!     → metrics.rs (dial/accept counters, connection gauges)
//!
//! Consumers:
//!     → stdout / configured writer
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::LogSink;
