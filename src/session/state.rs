//! Subscriber session state
//!
//! Tracks one subscriber connection from accept to close.

use std::net::SocketAddr;
use std::time::Instant;

use crate::registry::ClientId;
use crate::stats::SessionStats;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Registered with the broker, serving commands and updates
    Active,
    /// Session loop ended, client not yet unregistered
    Closing,
    /// Client unregistered
    Closed,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the connection
    PeerClosed,
    /// The broker closed the outbox (forced disconnect)
    Evicted,
    /// Writing to the peer did not finish in time
    WriteTimeout,
    /// Fatal protocol violation
    ProtocolError,
    /// Socket error
    IoError,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CloseReason::PeerClosed => "peer closed",
            CloseReason::Evicted => "evicted",
            CloseReason::WriteTimeout => "write timeout",
            CloseReason::ProtocolError => "protocol error",
            CloseReason::IoError => "io error",
        };
        f.write_str(s)
    }
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Broker client id of this session
    pub client_id: ClientId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Why the session ended, once it has
    pub close_reason: Option<CloseReason>,

    /// Counters
    pub stats: SessionStats,
}

impl SessionState {
    /// Create a new session state
    pub fn new(client_id: ClientId, peer_addr: SocketAddr) -> Self {
        Self {
            client_id,
            peer_addr,
            phase: SessionPhase::Active,
            connected_at: Instant::now(),
            close_reason: None,
            stats: SessionStats::new(),
        }
    }

    /// Leave the active phase; the first reason given wins
    pub fn close(&mut self, reason: CloseReason) {
        if self.phase == SessionPhase::Active {
            self.phase = SessionPhase::Closing;
            self.close_reason = Some(reason);
        }
    }

    /// Mark the client unregistered and freeze the duration
    pub fn finish(&mut self) {
        self.phase = SessionPhase::Closed;
        self.stats.duration = self.connected_at.elapsed();
    }

    /// Check if session is active
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }
}
