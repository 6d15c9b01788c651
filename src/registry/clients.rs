//! Client registry
//!
//! Allocates client identities and owns every client's outbox. The table is
//! not synchronized on its own; the broker keeps it behind the same lock as
//! the subscription index.

use std::collections::HashMap;

use tokio::sync::mpsc;

use super::entry::{ClientEntry, ClientHandle};
use super::update::{ClientId, Update};

/// Table of registered clients
#[derive(Debug)]
pub struct ClientTable {
    clients: HashMap<ClientId, ClientEntry>,
    next_id: u64,
}

impl ClientTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register a new client with a bounded outbox of `capacity` updates
    ///
    /// Identifiers come from a monotonic counter and are never handed out
    /// twice, so a closed client's slot cannot be resurrected.
    pub fn register(&mut self, capacity: usize) -> ClientHandle {
        let id = ClientId(self.next_id);
        self.next_id += 1;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.clients.insert(id, ClientEntry::new(tx));

        ClientHandle { id, outbox: rx }
    }

    /// Remove a client, returning its entry
    ///
    /// Dropping the returned entry releases the registry's sender and closes
    /// the outbox.
    pub fn remove(&mut self, id: ClientId) -> Option<ClientEntry> {
        self.clients.remove(&id)
    }

    /// Check whether a client is registered
    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    /// Get the outbox sender of a registered client
    pub fn outbox(&self, id: ClientId) -> Option<&mpsc::Sender<Update>> {
        self.clients.get(&id).map(|entry| &entry.outbox)
    }

    /// Number of registered clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no clients are registered
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientTable {
    fn default() -> Self {
        Self::new()
    }
}
