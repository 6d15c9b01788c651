//! Durable key-value storage
//!
//! The broker needs only two operations from its storage engine: an atomic,
//! durable single-key commit and a read that reflects the latest commit.
//! [`DurableStore`] captures that contract; [`RedbStore`] implements it on
//! top of the embedded `redb` B+tree engine.

pub mod error;
pub mod redb_store;

use bytes::Bytes;

pub use error::StoreError;
pub use redb_store::RedbStore;

/// Storage engine contract required by the broker
///
/// Implementations are called from tokio's blocking pool, so they may block
/// on disk I/O.
pub trait DurableStore: Send + Sync + 'static {
    /// Atomically and durably write `value` under `key`
    ///
    /// A successful return means the write is visible to every later
    /// [`read`](DurableStore::read).
    fn commit(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Read the latest committed value for `key`
    ///
    /// Returns [`StoreError::NotFound`] when the key has never been written.
    fn read(&self, key: &[u8]) -> Result<Bytes, StoreError>;
}
