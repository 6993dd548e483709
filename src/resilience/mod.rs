//! Resilience helpers.
//!
//! # Design Decisions
//! - Dial retries belong to the caller's connection pool, not this crate
//! - The only loop this crate retries itself is the accept loop

pub mod backoff;

pub use backoff::Backoff;
