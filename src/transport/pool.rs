//! Idle connection stacks, one per peer.
//!
//! # Responsibilities
//! - Hold released outbound connections for reuse
//! - Cap idle connections per peer at `max_pool`
//!
//! Eviction beyond that cap (LRU, staleness, error thresholds) is left to the
//! RPC layer that owns the pool policy.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use crate::net::Connection;
use crate::observability::metrics;

#[derive(Debug)]
pub struct IdlePool {
    peers: DashMap<String, Vec<Connection>>,
    max_per_peer: usize,
    idle: AtomicUsize,
}

impl IdlePool {
    pub fn new(max_per_peer: usize) -> Self {
        Self {
            peers: DashMap::new(),
            max_per_peer,
            idle: AtomicUsize::new(0),
        }
    }

    /// Pop the most recently released connection to `target`.
    pub fn take(&self, target: &str) -> Option<Connection> {
        let (conn, idle) = {
            let mut stack = self.peers.get_mut(target)?;
            let conn = stack.pop()?;
            // Counter moves under the shard lock so it never underflows.
            (conn, self.idle.fetch_sub(1, Ordering::Relaxed) - 1)
        };
        metrics::pooled_connections(idle);
        Some(conn)
    }

    /// Store `conn` for reuse. Hands it back when the peer's stack is full.
    pub fn put(&self, target: &str, conn: Connection) -> Result<(), Connection> {
        let idle = {
            let mut stack = self.peers.entry(target.to_string()).or_default();
            if stack.len() >= self.max_per_peer {
                return Err(conn);
            }
            stack.push(conn);
            self.idle.fetch_add(1, Ordering::Relaxed) + 1
        };
        metrics::pooled_connections(idle);
        Ok(())
    }

    /// Remove every idle connection.
    pub fn drain(&self) -> Vec<Connection> {
        let mut drained = Vec::new();
        self.peers.retain(|_, stack| {
            self.idle.fetch_sub(stack.len(), Ordering::Relaxed);
            drained.append(stack);
            false
        });
        metrics::pooled_connections(self.idle.load(Ordering::Relaxed));
        drained
    }

    pub fn idle_for(&self, target: &str) -> usize {
        self.peers.get(target).map_or(0, |stack| stack.len())
    }

    pub fn idle(&self) -> usize {
        self.idle.load(Ordering::Relaxed)
    }
}
