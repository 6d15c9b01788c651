//! Subscriber server listener
//!
//! Handles the TCP accept loop and spawns one connection task per
//! subscriber.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::registry::Broker;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::stats::ServerStats;

#[derive(Debug, Default)]
struct ListenerCounters {
    total: AtomicU64,
    active: AtomicU64,
    rejected: AtomicU64,
}

/// Line-protocol subscriber server
pub struct SubscriberServer {
    config: ServerConfig,
    broker: Arc<Broker>,
    connection_semaphore: Option<Arc<Semaphore>>,
    counters: Arc<ListenerCounters>,
}

impl SubscriberServer {
    /// Create a new server over a shared broker
    pub fn new(config: ServerConfig, broker: Arc<Broker>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            broker,
            connection_semaphore,
            counters: Arc::new(ListenerCounters::default()),
        }
    }

    /// Bind the configured subscriber address
    pub async fn bind(&self) -> Result<TcpListener> {
        Ok(TcpListener::bind(self.config.subscriber_addr).await?)
    }

    /// Run the server
    ///
    /// This method blocks until accepting fails fatally.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, std::future::pending()).await
    }

    /// Serve an already bound listener until `shutdown` resolves
    ///
    /// Sessions already running are not interrupted by shutdown.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Subscriber server listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!(addr = %addr, "Subscriber server shutting down");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let client = self.broker.register_client().await;
        self.counters.total.fetch_add(1, Ordering::Relaxed);
        self.counters.active.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            client_id = %client.id,
            peer = %peer_addr,
            "New subscriber connection"
        );

        let config = self.config.clone();
        let broker = Arc::clone(&self.broker);
        let counters = Arc::clone(&self.counters);

        tokio::spawn(async move {
            let _permit = permit;
            let client_id = client.id;
            let connection = Connection::new(client, socket, peer_addr, config, broker);

            if let Err(e) = connection.run().await {
                tracing::debug!(
                    client_id = %client_id,
                    error = %e,
                    "Connection error"
                );
            }

            counters.active.fetch_sub(1, Ordering::Relaxed);
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }

    /// Get listener statistics
    pub fn stats(&self) -> ServerStats {
        ServerStats {
            total_connections: self.counters.total.load(Ordering::Relaxed),
            active_connections: self.counters.active.load(Ordering::Relaxed),
            rejected_connections: self.counters.rejected.load(Ordering::Relaxed),
        }
    }
}
