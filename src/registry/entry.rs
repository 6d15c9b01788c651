//! Per-client registry state
//!
//! The registry keeps the sending half of every client's outbox; the adapter
//! that registered the client holds the receiving half in a [`ClientHandle`].

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::update::{ClientId, Update};

/// Registry entry for a single connected client
#[derive(Debug)]
pub struct ClientEntry {
    /// Sending half of the client's outbox
    pub(super) outbox: mpsc::Sender<Update>,

    /// When the client was registered
    pub registered_at: Instant,
}

impl ClientEntry {
    pub(super) fn new(outbox: mpsc::Sender<Update>) -> Self {
        Self {
            outbox,
            registered_at: Instant::now(),
        }
    }

    /// How long the client has been registered
    pub fn age(&self) -> Duration {
        self.registered_at.elapsed()
    }
}

/// Adapter-side handle to a registered client
///
/// `recv` yields updates in delivery order and returns `None` once the broker
/// has unregistered the client and every in-flight update has been drained.
#[derive(Debug)]
pub struct ClientHandle {
    /// The client's identity
    pub id: ClientId,

    /// Receiving half of the outbox
    pub outbox: mpsc::Receiver<Update>,
}

impl ClientHandle {
    /// Receive the next update
    pub async fn recv(&mut self) -> Option<Update> {
        self.outbox.recv().await
    }

    /// Receive an update if one is queued, without waiting
    pub fn try_recv(&mut self) -> Result<Update, mpsc::error::TryRecvError> {
        self.outbox.try_recv()
    }

    /// Number of updates waiting in the outbox
    pub fn queued(&self) -> usize {
        self.outbox.len()
    }
}
