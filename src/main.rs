//! Consensus node transport daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   raft-stream-node (listener owner)
//!     │  bind(bind_address) ──▶ ListenerHandle
//!     │
//!     ▼
//!   transport::factory ──▶ net::advertise (validate once)
//!     │                        │
//!     │                        ▼
//!     │                  net::stream_layer (dial / accept / close / addr)
//!     ▼
//!   transport::network ──▶ accept loop ──▶ inbound connections
//!                     └──▶ acquire / release ──▶ outbound connections
//! ```
//!
//! Without an RPC layer attached, inbound connections are logged and closed.

use std::path::PathBuf;

use clap::Parser;

use raft_stream_transport::config::{self, NodeConfig};
use raft_stream_transport::lifecycle::signals::shutdown_signal;
use raft_stream_transport::observability::{logging, metrics};
use raft_stream_transport::{new_tcp_transport, ListenerHandle};

#[derive(Parser)]
#[command(name = "raft-stream-node")]
#[command(about = "Stream transport endpoint for a consensus cluster node", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `transport.bind_address`.
    #[arg(long)]
    bind: Option<String>,

    /// Override `transport.advertise_address`.
    #[arg(long)]
    advertise: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Validated once, after the command line has had its say.
    let mut node_config = match &cli.config {
        Some(path) => config::read_config(path)?,
        None => NodeConfig::default(),
    };
    if let Some(bind) = cli.bind {
        node_config.transport.bind_address = bind;
    }
    if let Some(advertise) = cli.advertise {
        node_config.transport.advertise_address = Some(advertise);
    }
    config::validate_config(&node_config).map_err(config::ConfigError::Validation)?;

    logging::init(&node_config.logging.level);
    tracing::info!("raft-stream-node v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %node_config.transport.bind_address,
        advertise_address = ?node_config.transport.advertise_address,
        max_pool = node_config.transport.max_pool,
        timeout_ms = node_config.transport.timeout_ms,
        "Configuration loaded"
    );

    if node_config.observability.metrics_enabled {
        // Validation guarantees this parses.
        if let Ok(addr) = node_config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    // This binary is the listener owner; the transport only borrows it.
    let listener = ListenerHandle::bind(&node_config.transport.bind_address).await?;

    let transport = new_tcp_transport(
        &node_config.transport.bind_address,
        node_config.transport.advertise()?,
        node_config.transport.options(node_config.logging.log_sink()?),
        listener.clone(),
    )
    .inspect_err(|e| tracing::error!(error = %e, "Refusing to join cluster"))?;

    tracing::info!(address = %transport.local_addr(), "Advertising to peers");

    let mut inbound = transport
        .take_inbound()
        .ok_or("inbound connections already taken")?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            conn = inbound.recv() => match conn {
                Some(conn) => {
                    tracing::info!(
                        connection_id = %conn.id(),
                        peer_addr = %conn.peer_addr(),
                        "Inbound peer connection (no RPC layer attached)"
                    );
                    if let Err(e) = conn.close().await {
                        tracing::debug!(error = %e, "Failed to shut down connection");
                    }
                }
                None => {
                    tracing::warn!("Accept loop ended");
                    break;
                }
            },
        }
    }

    transport.close().await?;
    listener.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
