//! Storage error types

use thiserror::Error;

/// Error type for durable store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key has never been written
    #[error("key not found: {0}")]
    NotFound(String),

    /// Filesystem failure (creating the store directory, custom engines)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// redb could not open or create the database file
    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// redb could not begin a transaction
    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),

    /// redb could not open the key-value table
    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    /// redb storage failure during get/insert
    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    /// redb failed to commit the write transaction
    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// The blocking task running the store operation panicked or was cancelled
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Build a [`StoreError::NotFound`] for a raw key
    pub fn not_found(key: &[u8]) -> Self {
        StoreError::NotFound(String::from_utf8_lossy(key).into_owned())
    }

    /// Whether this error only reports an absent key
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        StoreError::Transaction(Box::new(e))
    }
}
