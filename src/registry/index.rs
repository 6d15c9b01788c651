//! Subscription index
//!
//! A single (key, client) relation with two access paths: key → clients for
//! fan-out, client → keys for teardown. Both maps are only ever changed
//! together through the methods below, so they cannot disagree.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;

use super::update::ClientId;

/// Bidirectional key ↔ client subscription index
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    by_key: HashMap<Bytes, HashSet<ClientId>>,
    by_client: HashMap<ClientId, HashSet<Bytes>>,
}

impl SubscriptionIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a (key, client) relation
    ///
    /// Returns `false` if the relation already existed.
    pub fn insert(&mut self, client: ClientId, key: Bytes) -> bool {
        let added = self.by_key.entry(key.clone()).or_default().insert(client);
        if added {
            self.by_client.entry(client).or_default().insert(key);
        }
        added
    }

    /// Remove a single (key, client) relation
    ///
    /// Returns `false` if it was not present.
    pub fn remove(&mut self, client: ClientId, key: &[u8]) -> bool {
        let Some(clients) = self.by_key.get_mut(key) else {
            return false;
        };
        if !clients.remove(&client) {
            return false;
        }
        if clients.is_empty() {
            self.by_key.remove(key);
        }

        if let Some(keys) = self.by_client.get_mut(&client) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_client.remove(&client);
            }
        }
        true
    }

    /// Remove every relation of a client, returning the keys it was
    /// subscribed to
    pub fn remove_client(&mut self, client: ClientId) -> Vec<Bytes> {
        let Some(keys) = self.by_client.remove(&client) else {
            return Vec::new();
        };

        for key in &keys {
            if let Some(clients) = self.by_key.get_mut(key) {
                clients.remove(&client);
                if clients.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }

        keys.into_iter().collect()
    }

    /// Clients currently subscribed to `key`
    pub fn subscribers<'a>(&'a self, key: &[u8]) -> impl Iterator<Item = ClientId> + 'a {
        self.by_key
            .get(key)
            .into_iter()
            .flat_map(|clients| clients.iter().copied())
    }

    /// Check whether a client is subscribed to a key
    pub fn contains(&self, client: ClientId, key: &[u8]) -> bool {
        self.by_key
            .get(key)
            .is_some_and(|clients| clients.contains(&client))
    }

    /// Number of keys a client is subscribed to
    pub fn key_count_for(&self, client: ClientId) -> usize {
        self.by_client.get(&client).map_or(0, HashSet::len)
    }

    /// Total number of (key, client) relations
    pub fn len(&self) -> usize {
        self.by_client.values().map(HashSet::len).sum()
    }

    /// Whether the index holds no relations
    pub fn is_empty(&self) -> bool {
        self.by_client.is_empty()
    }

    /// Number of keys with at least one subscriber
    pub fn watched_keys(&self) -> usize {
        self.by_key.len()
    }
}
