//! Subscriber listener and HTTP writer
//!
//! [`serve`] binds both adapters over one shared broker and runs them until
//! a shutdown future resolves.

pub mod config;
pub mod connection;
pub mod http;
pub mod listener;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;

pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::SubscriberServer;

use crate::error::Result;
use crate::registry::Broker;

/// Run the subscriber listener and the HTTP writer until `shutdown` resolves
///
/// Returns early with the first error if either adapter fails.
pub async fn serve<F>(config: ServerConfig, broker: Arc<Broker>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let subscribers = SubscriberServer::new(config.clone(), Arc::clone(&broker));
    let subscriber_listener = subscribers.bind().await?;
    let writer_listener = TcpListener::bind(config.writer_addr).await?;

    let (stop_tx, stop_rx) = watch::channel(false);

    let servers = async {
        tokio::try_join!(
            subscribers.serve(subscriber_listener, stopped(stop_rx.clone())),
            http::serve(writer_listener, broker, stopped(stop_rx)),
        )
        .map(|_| ())
    };
    tokio::pin!(servers);

    tokio::select! {
        result = &mut servers => result,
        _ = shutdown => {
            let _ = stop_tx.send(true);
            servers.await
        }
    }
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
