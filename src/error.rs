//! Crate-level error type
//!
//! Storage keeps its own error enum ([`StoreError`]); this type is what the
//! server entry points return.

use thiserror::Error;

use crate::storage::StoreError;

/// Top-level error for server and bootstrap operations
#[derive(Debug, Error)]
pub enum Error {
    /// Socket or filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Durable store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Update could not be serialized for the wire
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Line protocol violation that ends a session
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Fatal violations of the subscriber line protocol
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A command line exceeded the configured maximum length
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// A command line was not valid UTF-8
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// Result alias for server and bootstrap operations
pub type Result<T> = std::result::Result<T, Error>;
