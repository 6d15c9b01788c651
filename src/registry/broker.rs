//! Notification broker
//!
//! Coordinates durable writes with subscriber notification. Writers call
//! [`Broker::set`]; subscriber adapters register a client, subscribe it to
//! keys and drain its outbox.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, RwLock};

use super::clients::ClientTable;
use super::config::{BrokerConfig, OverflowPolicy};
use super::entry::ClientHandle;
use super::error::BrokerError;
use super::index::SubscriptionIndex;
use super::update::{ClientId, Update};
use crate::stats::{BrokerCounters, BrokerStats};
use crate::storage::{DurableStore, StoreError};

/// Registry and index, guarded together by one lock
#[derive(Debug, Default)]
struct BrokerState {
    clients: ClientTable,
    index: SubscriptionIndex,
}

/// Outcome of a single non-blocking delivery
enum Delivery {
    Delivered,
    Stalled,
    Closed,
}

/// Central broker tying the durable store to live subscribers
///
/// Lock order is always write lane, then state. The state lock is never held
/// across a store operation or an `.await` on a subscriber.
pub struct Broker {
    /// Durable store all reads and writes go to
    store: Arc<dyn DurableStore>,

    /// Client table and subscription index
    state: RwLock<BrokerState>,

    /// Per-key sequencing of commit + fan-out and of subscribe catch-up,
    /// sharded by key hash
    lanes: Box<[Mutex<()>]>,

    /// Monotonic counters
    counters: BrokerCounters,

    /// Configuration
    config: BrokerConfig,
}

impl Broker {
    /// Create a broker over `store` with default configuration
    pub fn new(store: impl DurableStore) -> Self {
        Self::with_config(store, BrokerConfig::default())
    }

    /// Create a broker over `store` with custom configuration
    pub fn with_config(store: impl DurableStore, config: BrokerConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create a broker over an already shared store
    pub fn from_shared(store: Arc<dyn DurableStore>, config: BrokerConfig) -> Self {
        let lanes = (0..config.write_lanes.max(1))
            .map(|_| Mutex::new(()))
            .collect();

        Self {
            store,
            state: RwLock::new(BrokerState::default()),
            lanes,
            counters: BrokerCounters::default(),
            config,
        }
    }

    /// Get the broker configuration
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Register a new client
    ///
    /// The returned handle carries the client's id and the receiving half of
    /// its outbox. The adapter must call [`unregister_client`] when the
    /// connection ends.
    ///
    /// [`unregister_client`]: Broker::unregister_client
    pub async fn register_client(&self) -> ClientHandle {
        let mut state = self.state.write().await;
        let handle = state.clients.register(self.config.outbox_capacity);

        tracing::debug!(
            client_id = %handle.id,
            clients = state.clients.len(),
            "Client registered"
        );

        handle
    }

    /// Unregister a client
    ///
    /// Removes all of the client's subscriptions, then closes its outbox, in
    /// one critical section. Idempotent: returns `false` if the client was not
    /// registered.
    pub async fn unregister_client(&self, id: ClientId) -> bool {
        let mut state = self.state.write().await;

        let keys = state.index.remove_client(id);
        let Some(entry) = state.clients.remove(id) else {
            return false;
        };

        tracing::debug!(
            client_id = %id,
            subscriptions = keys.len(),
            registered_secs = entry.age().as_secs(),
            clients = state.clients.len(),
            "Client unregistered"
        );

        // Drops the only sender; the outbox closes here
        drop(entry);
        true
    }

    /// Subscribe a client to a key
    ///
    /// On a new subscription the key's current value, if any, is delivered to
    /// the client before this returns. Subscribing twice is a no-op, as is
    /// subscribing a client that is not registered. Returns whether a new
    /// subscription was added.
    pub async fn subscribe(&self, id: ClientId, key: impl Into<Bytes>) -> bool {
        let key = key.into();
        let _lane = self.lane(&key).lock().await;

        {
            let mut state = self.state.write().await;
            if !state.clients.contains(id) {
                tracing::debug!(
                    error = %BrokerError::UnknownClient(id),
                    key = %String::from_utf8_lossy(&key),
                    "Subscribe ignored"
                );
                return false;
            }

            if !state.index.insert(id, key.clone()) {
                return false;
            }

            tracing::debug!(
                client_id = %id,
                key = %String::from_utf8_lossy(&key),
                subscriptions = state.index.key_count_for(id),
                "Subscribed"
            );
        }

        // Catch-up runs under the lane, so no write to this key can commit
        // between the read and the delivery
        match self.read(key.clone()).await {
            Ok(value) => {
                let delivery = {
                    let state = self.state.read().await;
                    state
                        .clients
                        .outbox(id)
                        .map(|outbox| self.deliver(id, outbox, Update { key, value }))
                };
                if let Some(Delivery::Stalled) = delivery {
                    self.on_stalled(&[id]).await;
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                tracing::warn!(
                    client_id = %id,
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "Catch-up read failed"
                );
            }
        }

        true
    }

    /// Unsubscribe a client from a key
    ///
    /// Returns whether a subscription was removed.
    pub async fn unsubscribe(&self, id: ClientId, key: &[u8]) -> bool {
        let mut state = self.state.write().await;

        if !state.clients.contains(id) {
            tracing::debug!(
                error = %BrokerError::UnknownClient(id),
                key = %String::from_utf8_lossy(key),
                "Unsubscribe ignored"
            );
            return false;
        }

        let removed = state.index.remove(id, key);
        if removed {
            tracing::debug!(
                client_id = %id,
                key = %String::from_utf8_lossy(key),
                "Unsubscribed"
            );
        }
        removed
    }

    /// Write a value and notify the key's subscribers
    ///
    /// The value is committed to the durable store first; only a successful
    /// commit is fanned out. A commit failure is returned unchanged. Fan-out
    /// never waits on a subscriber: a full outbox is handled by the
    /// configured [`OverflowPolicy`].
    pub async fn set(
        &self,
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Result<(), StoreError> {
        let key = key.into();
        let value = value.into();
        let _lane = self.lane(&key).lock().await;

        if let Err(e) = self.commit(key.clone(), value.clone()).await {
            BrokerCounters::bump(&self.counters.writes_failed);
            tracing::warn!(
                key = %String::from_utf8_lossy(&key),
                error = %e,
                "Commit failed"
            );
            return Err(e);
        }
        BrokerCounters::bump(&self.counters.writes_committed);

        // Delivery never waits, so it runs under the read guard; a client
        // unregistered before this point is never handed the update
        let update = Update { key, value };
        let (subscribers, stalled) = {
            let state = self.state.read().await;
            let mut subscribers = 0usize;
            let mut stalled = Vec::new();
            for id in state.index.subscribers(&update.key) {
                let Some(outbox) = state.clients.outbox(id) else {
                    continue;
                };
                subscribers += 1;
                if let Delivery::Stalled = self.deliver(id, outbox, update.clone()) {
                    stalled.push(id);
                }
            }
            (subscribers, stalled)
        };

        if subscribers == 0 {
            return Ok(());
        }

        tracing::trace!(
            key = %String::from_utf8_lossy(&update.key),
            subscribers,
            stalled = stalled.len(),
            "Fan-out complete"
        );

        if !stalled.is_empty() {
            self.on_stalled(&stalled).await;
        }

        Ok(())
    }

    /// Read the latest committed value for a key
    ///
    /// Returns [`StoreError::NotFound`] for a key that was never written.
    pub async fn get(&self, key: impl Into<Bytes>) -> Result<Bytes, StoreError> {
        self.read(key.into()).await
    }

    /// Check whether a client is subscribed to a key
    pub async fn is_subscribed(&self, id: ClientId, key: &[u8]) -> bool {
        self.state.read().await.index.contains(id, key)
    }

    /// Check whether a client is registered
    pub async fn is_registered(&self, id: ClientId) -> bool {
        self.state.read().await.clients.contains(id)
    }

    /// Get broker statistics
    pub async fn stats(&self) -> BrokerStats {
        let mut stats = {
            let state = self.state.read().await;
            BrokerStats {
                registered_clients: state.clients.len(),
                subscriptions: state.index.len(),
                watched_keys: state.index.watched_keys(),
                ..Default::default()
            }
        };
        self.counters.fill(&mut stats);
        stats
    }

    fn lane(&self, key: &[u8]) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let slot = (hasher.finish() % self.lanes.len() as u64) as usize;
        &self.lanes[slot]
    }

    async fn commit(&self, key: Bytes, value: Bytes) -> Result<(), StoreError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.commit(&key, &value)).await?
    }

    async fn read(&self, key: Bytes) -> Result<Bytes, StoreError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.read(&key)).await?
    }

    /// Place one update in a client's outbox without waiting
    fn deliver(&self, id: ClientId, outbox: &mpsc::Sender<Update>, update: Update) -> Delivery {
        match outbox.try_send(update) {
            Ok(()) => {
                BrokerCounters::bump(&self.counters.deliveries);
                Delivery::Delivered
            }
            Err(TrySendError::Full(update)) => {
                BrokerCounters::bump(&self.counters.dropped_deliveries);
                tracing::warn!(
                    error = %BrokerError::DeliveryStall {
                        client: id,
                        capacity: self.config.outbox_capacity,
                    },
                    key = %String::from_utf8_lossy(&update.key),
                    policy = %self.config.overflow_policy,
                    "Delivery stalled"
                );
                Delivery::Stalled
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(
                    error = %BrokerError::UnknownClient(id),
                    "Delivery skipped"
                );
                Delivery::Closed
            }
        }
    }

    /// Apply the overflow policy to clients whose outbox was full
    async fn on_stalled(&self, ids: &[ClientId]) {
        if self.config.overflow_policy != OverflowPolicy::Disconnect {
            return;
        }

        for &id in ids {
            if self.unregister_client(id).await {
                BrokerCounters::bump(&self.counters.forced_disconnects);
                tracing::warn!(client_id = %id, "Stalled client disconnected");
            }
        }
    }
}
