//! Statistics for the broker, the subscriber listener and sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Broker-wide statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BrokerStats {
    /// Currently registered clients
    pub registered_clients: usize,
    /// Current (key, client) subscriptions
    pub subscriptions: usize,
    /// Keys with at least one subscriber
    pub watched_keys: usize,
    /// Writes committed to the durable store
    pub writes_committed: u64,
    /// Writes the durable store rejected
    pub writes_failed: u64,
    /// Updates placed in an outbox (fan-out and catch-up)
    pub deliveries: u64,
    /// Updates discarded because an outbox was full
    pub dropped_deliveries: u64,
    /// Clients unregistered for stalling
    pub forced_disconnects: u64,
}

/// Monotonic broker counters
///
/// Relaxed ordering: the counters are informational and never used to
/// synchronize.
#[derive(Debug, Default)]
pub struct BrokerCounters {
    pub writes_committed: AtomicU64,
    pub writes_failed: AtomicU64,
    pub deliveries: AtomicU64,
    pub dropped_deliveries: AtomicU64,
    pub forced_disconnects: AtomicU64,
}

impl BrokerCounters {
    /// Increment a counter by one
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Fill the counter fields of a stats snapshot
    pub fn fill(&self, stats: &mut BrokerStats) {
        stats.writes_committed = self.writes_committed.load(Ordering::Relaxed);
        stats.writes_failed = self.writes_failed.load(Ordering::Relaxed);
        stats.deliveries = self.deliveries.load(Ordering::Relaxed);
        stats.dropped_deliveries = self.dropped_deliveries.load(Ordering::Relaxed);
        stats.forced_disconnects = self.forced_disconnects.load(Ordering::Relaxed);
    }
}

/// Subscriber listener statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerStats {
    /// Total connections ever accepted
    pub total_connections: u64,
    /// Connections currently being served
    pub active_connections: u64,
    /// Connections refused because of the connection limit
    pub rejected_connections: u64,
}

/// Per-session statistics
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Command lines received (valid or not)
    pub commands: u64,
    /// Updates written to the peer
    pub updates_sent: u64,
    /// Bytes written to the peer
    pub bytes_sent: u64,
    /// Session duration
    pub duration: Duration,
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one update written to the peer
    pub fn on_update(&mut self, bytes: usize) {
        self.updates_sent += 1;
        self.bytes_sent += bytes as u64;
    }
}
