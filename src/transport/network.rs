//! Network transport over a stream layer.
//!
//! # Responsibilities
//! - Open outbound connections through the stream layer, reusing idle ones
//! - Run the accept loop and hand inbound connections to the RPC layer
//! - Route all log events to the configured sink
//!
//! # Accept Loop
//! ```text
//! accept() ─ Ok(conn) ──────────────▶ inbound channel, reset backoff
//!          ├ Err(ListenerClosed) ──▶ exit
//!          └ Err(transient) ───────▶ log, sleep(backoff), retry
//! transport close() ───────────────▶ exit
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::instrument::WithSubscriber;
use tracing::Dispatch;

use crate::error::Result;
use crate::lifecycle::Shutdown;
use crate::net::{Connection, StreamLayer};
use crate::resilience::Backoff;
use crate::transport::pool::IdlePool;

const INBOUND_CAPACITY: usize = 64;
const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Transport handed to the consensus engine's RPC layer.
///
/// Created by [`new_tcp_transport`](crate::transport::new_tcp_transport) or
/// [`with_stream_layer`](crate::transport::with_stream_layer). Must be created
/// inside a Tokio runtime; the accept loop is spawned immediately and stops
/// on [`close`](Self::close) or when the transport is dropped, so another
/// transport can take over the same listener.
#[derive(Debug)]
pub struct NetworkTransport {
    stream: Arc<dyn StreamLayer>,
    max_pool: usize,
    timeout: Duration,
    pool: IdlePool,
    inbound: Mutex<Option<mpsc::Receiver<Connection>>>,
    shutdown: Shutdown,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    dispatch: Dispatch,
}

impl NetworkTransport {
    pub(crate) fn new(
        stream: Arc<dyn StreamLayer>,
        max_pool: usize,
        timeout: Duration,
        dispatch: Dispatch,
    ) -> Self {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let shutdown = Shutdown::new();

        let accept_task = tokio::spawn(
            accept_loop(Arc::clone(&stream), tx, shutdown.clone()).with_subscriber(dispatch.clone()),
        );

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!(
                advertise = %stream.addr(),
                max_pool,
                timeout_ms = timeout.as_millis() as u64,
                "Network transport started"
            );
        });

        Self {
            stream,
            max_pool,
            timeout,
            pool: IdlePool::new(max_pool),
            inbound: Mutex::new(Some(rx)),
            shutdown,
            accept_task: Mutex::new(Some(accept_task)),
            dispatch,
        }
    }

    /// The address peers use to reach this node.
    pub fn local_addr(&self) -> SocketAddr {
        self.stream.addr()
    }

    pub fn stream(&self) -> &Arc<dyn StreamLayer> {
        &self.stream
    }

    pub fn max_pool(&self) -> usize {
        self.max_pool
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Idle connections currently held for `target`.
    pub fn idle_connections(&self, target: &str) -> usize {
        self.pool.idle_for(target)
    }

    /// Get a connection to `target`: an idle one if available, otherwise a
    /// fresh dial bounded by the transport timeout.
    pub async fn acquire(&self, target: &str) -> Result<Connection> {
        if let Some(conn) = self.pool.take(target) {
            tracing::dispatcher::with_default(&self.dispatch, || {
                tracing::trace!(%target, connection_id = %conn.id(), "Reusing pooled connection");
            });
            return Ok(conn);
        }

        async {
            let conn = self.stream.dial(target, self.timeout).await?;
            tracing::debug!(%target, connection_id = %conn.id(), "Dialed peer");
            Ok(conn)
        }
        .with_subscriber(self.dispatch.clone())
        .await
    }

    /// Return a healthy connection for reuse. Dropped if the peer already has
    /// `max_pool` idle connections or the transport is shut down.
    pub fn release(&self, target: &str, conn: Connection) {
        tracing::dispatcher::with_default(&self.dispatch, || {
            if self.shutdown.is_triggered() {
                tracing::trace!(%target, connection_id = %conn.id(), "Transport closed, dropping connection");
                return;
            }
            if let Err(conn) = self.pool.put(target, conn) {
                tracing::trace!(%target, connection_id = %conn.id(), "Pool full, dropping connection");
            }
        });
    }

    /// Take the receiver of inbound connections. Returns `None` after the
    /// first call.
    pub fn take_inbound(&self) -> Option<mpsc::Receiver<Connection>> {
        self.inbound.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Stop the accept loop, close the stream layer and drop idle
    /// connections. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if !self.shutdown.trigger() {
            return Ok(());
        }

        async {
            let accept_task = self.accept_task.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(task) = accept_task {
                // The loop exits on the shutdown signal; a join error only means it panicked.
                if let Err(e) = task.await {
                    tracing::error!(error = %e, "Accept loop terminated abnormally");
                }
            }

            let result = self.stream.close().await;
            let dropped = self.pool.drain().len();
            tracing::info!(advertise = %self.stream.addr(), dropped, "Network transport closed");
            result
        }
        .with_subscriber(self.dispatch.clone())
        .await
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

impl Drop for NetworkTransport {
    fn drop(&mut self) {
        self.shutdown.trigger();
        let accept_task = self.accept_task.get_mut().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = accept_task {
            task.abort();
            tracing::dispatcher::with_default(&self.dispatch, || {
                tracing::debug!(advertise = %self.stream.addr(), "Network transport dropped, accept loop aborted");
            });
        }
    }
}

async fn accept_loop(stream: Arc<dyn StreamLayer>, tx: mpsc::Sender<Connection>, shutdown: Shutdown) {
    let mut backoff = Backoff::new(ACCEPT_BACKOFF_BASE, ACCEPT_BACKOFF_MAX);

    loop {
        let accepted = tokio::select! {
            _ = shutdown.wait() => {
                tracing::debug!("Accept loop stopped by transport shutdown");
                return;
            }
            accepted = stream.accept() => accepted,
        };

        match accepted {
            Ok(conn) => {
                backoff.reset();
                tokio::select! {
                    _ = shutdown.wait() => return,
                    sent = tx.send(conn) => {
                        if let Err(mpsc::error::SendError(conn)) = sent {
                            tracing::debug!(peer_addr = %conn.peer_addr(), "No inbound consumer, dropping connection");
                        }
                    }
                }
            }
            Err(e) if e.is_terminal() => {
                tracing::info!("Listener closed, accept loop exiting");
                return;
            }
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::warn!(error = %e, ?delay, "Failed to accept connection");
                tokio::select! {
                    _ = shutdown.wait() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
