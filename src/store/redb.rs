//! Redb-backed durable tier for match snapshots.
//!
//! One table, keyed by subject id, holding JSON-encoded
//! [`PersistedSnapshot`] rows. Every upsert is its own write transaction, so
//! a crash never leaves a half-written row behind.
//!
//! redb transactions block, so each call hops onto tokio's blocking pool
//! and the calling task never stalls a runtime worker.
//!
//! # Configuration Example
//! ```toml
//! [storage]
//! snapshot_path = "/data/mentormatch.redb"
//! ```

use std::path::Path;
use std::sync::Arc;

use ::redb::{Database, ReadableDatabase, TableDefinition};
use async_trait::async_trait;

use crate::error::StoreError;
use crate::profile::PersistedSnapshot;
use crate::store::SnapshotStore;

const SNAPSHOT_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("match_snapshots");

/// Persistent [`SnapshotStore`] on a single redb file.
///
/// Cloning shares the same database handle.
#[derive(Clone)]
pub struct RedbSnapshotStore {
    db: Arc<Database>,
}

impl RedbSnapshotStore {
    /// Open or create the database at `path` and make sure the table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(|e| StoreError::backend(e.to_string()))?;

        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        {
            // Opening the table creates it.
            let _table = write_txn
                .open_table(SNAPSHOT_TABLE)
                .map_err(|e| StoreError::backend(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::backend(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn put(db: &Database, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(SNAPSHOT_TABLE)
                .map_err(|e| StoreError::backend(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| StoreError::backend(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::backend(e.to_string()))
    }

    fn get(db: &Database, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = db
            .begin_read()
            .map_err(|e| StoreError::backend(e.to_string()))?;
        let table = read_txn
            .open_table(SNAPSHOT_TABLE)
            .map_err(|e| StoreError::backend(e.to_string()))?;

        let value = table
            .get(key)
            .map_err(|e| StoreError::backend(e.to_string()))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }
}

#[async_trait]
impl SnapshotStore for RedbSnapshotStore {
    async fn persist_snapshot(&self, snapshot: &PersistedSnapshot) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(snapshot)?;
        let key = snapshot.subject_id.clone();
        let db = Arc::clone(&self.db);

        tokio::task::spawn_blocking(move || Self::put(&db, &key, &encoded))
            .await
            .map_err(|e| StoreError::backend(format!("snapshot write task failed: {e}")))?
    }

    async fn load_snapshot(
        &self,
        subject_id: &str,
    ) -> Result<Option<PersistedSnapshot>, StoreError> {
        let key = subject_id.to_string();
        let db = Arc::clone(&self.db);

        let encoded = tokio::task::spawn_blocking(move || Self::get(&db, &key))
            .await
            .map_err(|e| StoreError::backend(format!("snapshot read task failed: {e}")))??;

        encoded
            .map(|bytes| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .transpose()
    }
}
