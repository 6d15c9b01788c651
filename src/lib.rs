//! # subkv
//!
//! A durable key-value store with live change notification. Values are
//! written over HTTP and committed to an embedded redb database; clients
//! subscribed to a key over the line protocol receive each committed value
//! as a JSON line.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use subkv::{Broker, RedbStore, ServerConfig};
//!
//! # async fn example() -> subkv::error::Result<()> {
//! let store = RedbStore::open("/tmp/subkv")?;
//! let broker = Arc::new(Broker::new(store));
//!
//! // In-process use: register a client and subscribe it
//! let mut client = broker.register_client().await;
//! broker.subscribe(client.id, "greeting").await;
//! broker.set("greeting", "hello").await?;
//! assert_eq!(client.recv().await.unwrap().value, "hello");
//!
//! // Or serve both network adapters until Ctrl+C
//! subkv::server::serve(ServerConfig::default(), broker, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod storage;

pub use error::{Error, Result};
pub use registry::{
    Broker, BrokerConfig, BrokerError, ClientHandle, ClientId, OverflowPolicy, Update,
};
pub use server::{ServerConfig, SubscriberServer};
pub use stats::{BrokerStats, ServerStats};
pub use storage::{DurableStore, RedbStore, StoreError};
