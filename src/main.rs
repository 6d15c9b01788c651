//! subkv server
//!
//! Serves the HTTP writer and the line-protocol subscriber listener over one
//! redb store.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subkv::{Broker, BrokerConfig, OverflowPolicy, RedbStore, ServerConfig};

/// Durable key-value store with live change notification
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Store directory (e.g. /tmp/subkv), created if missing
    #[arg(long)]
    store_path: PathBuf,

    /// Address of the HTTP writer (e.g. 127.0.0.1:5500)
    #[arg(long)]
    writer_addr: SocketAddr,

    /// Address of the subscriber listener (e.g. 127.0.0.1:5501)
    #[arg(long)]
    subscriber_addr: SocketAddr,

    /// Updates buffered per subscriber before the overflow policy applies
    #[arg(long, default_value_t = 1024)]
    outbox_capacity: usize,

    /// What to do with a subscriber whose buffer is full: disconnect or drop-newest
    #[arg(long, default_value_t = OverflowPolicy::Disconnect)]
    overflow_policy: OverflowPolicy,

    /// Maximum concurrent subscriber connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

    /// Set TCP_NODELAY on subscriber sockets
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    tcp_nodelay: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("subkv={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting subkv server");

    let store = RedbStore::open(&args.store_path)
        .with_context(|| format!("opening store at {}", args.store_path.display()))?;

    let broker_config = BrokerConfig::default()
        .outbox_capacity(args.outbox_capacity)
        .overflow_policy(args.overflow_policy);
    let broker = Arc::new(Broker::with_config(store, broker_config));

    let server_config = ServerConfig::with_addrs(args.subscriber_addr, args.writer_addr)
        .max_connections(args.max_connections)
        .tcp_nodelay(args.tcp_nodelay);

    subkv::server::serve(server_config, broker, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await?;

    Ok(())
}
