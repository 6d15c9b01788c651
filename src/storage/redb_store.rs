//! Durable store backed by redb
//!
//! A single flat table maps raw key bytes to raw value bytes. Every
//! [`commit`](DurableStore::commit) is its own write transaction, so redb's
//! single-writer lock serializes commits and each one is durable on return.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use redb::{Database, ReadableDatabase, TableDefinition};

use super::{DurableStore, StoreError};

/// File name of the database inside the store directory
pub const DATABASE_FILE: &str = "subkv.redb";

const KV_TABLE: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("kv");

/// Durable key-value store on a redb database file
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Open (or create) the store inside `dir`
    ///
    /// The directory is created if it does not exist. The key-value table is
    /// created eagerly so reads work before the first write.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let path = dir.join(DATABASE_FILE);
        let db = Database::create(&path)?;

        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(KV_TABLE)?;
        }
        txn.commit()?;

        tracing::info!(path = %path.display(), "Opened redb store");

        Ok(Self { db, path })
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DurableStore for RedbStore {
    fn commit(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(KV_TABLE)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn read(&self, key: &[u8]) -> Result<Bytes, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(KV_TABLE)?;

        match table.get(key)? {
            Some(guard) => Ok(Bytes::copy_from_slice(guard.value())),
            None => Err(StoreError::not_found(key)),
        }
    }
}
