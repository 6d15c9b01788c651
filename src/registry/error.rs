//! Broker error types
//!
//! Neither variant reaches writers: both are absorbed inside the broker and
//! logged, since they are normal consequences of concurrent disconnects and
//! slow consumers.

use thiserror::Error;

use super::update::ClientId;

/// Error type for subscription-side broker operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The client is not (or no longer) registered
    #[error("client {0} is not registered")]
    UnknownClient(ClientId),

    /// The client's outbox is full
    #[error("outbox of client {client} is full ({capacity} updates)")]
    DeliveryStall { client: ClientId, capacity: usize },
}
