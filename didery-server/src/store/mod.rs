mod blob;
mod history;
mod locks;
pub mod policy;

pub use blob::BlobStore;
pub use history::HistoryStore;
pub use locks::{KeyGuard, KeyLocks};
pub use policy::ConflictMode;

use crate::config::StoreConfig;
use crate::error::AppError;
use fjall::{KeyspaceCreateOptions, PersistMode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

pub const HISTORY_KEYSPACE: &str = "history";
pub const EVENTS_KEYSPACE: &str = "events";
pub const BLOBS_KEYSPACE: &str = "blobs";

fn store_err(e: impl std::fmt::Display) -> AppError {
    AppError::Store(e.to_string())
}

fn join_err(e: tokio::task::JoinError) -> AppError {
    AppError::Internal(format!("blocking task panicked: {e}"))
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Store {
    db: fjall::Database,
}

#[derive(Clone)]
pub struct KeyspaceHandle {
    keyspace: fjall::Keyspace,
}

impl Store {
    pub fn open(config: &StoreConfig) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.data_dir).map_err(AppError::Io)?;

        info!(path = %config.data_dir.display(), "opening fjall store");

        let db = fjall::Database::builder(&config.data_dir)
            .open()
            .map_err(store_err)?;

        Ok(Self { db })
    }

    pub fn keyspace(&self, name: &str) -> Result<KeyspaceHandle, AppError> {
        let keyspace = self
            .db
            .keyspace(name, KeyspaceCreateOptions::default)
            .map_err(store_err)?;
        Ok(KeyspaceHandle { keyspace })
    }

    /// Start an atomic multi-keyspace write.
    pub fn batch(&self) -> WriteBatch {
        WriteBatch {
            batch: self.db.batch(),
        }
    }

    pub async fn persist(&self) -> Result<(), AppError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.persist(PersistMode::SyncAll))
            .await
            .map_err(join_err)?
            .map_err(store_err)
    }
}

// ---------------------------------------------------------------------------
// KeyspaceHandle
// ---------------------------------------------------------------------------

impl KeyspaceHandle {
    pub async fn insert<V: Serialize>(
        &self,
        key: impl Into<Vec<u8>>,
        value: &V,
    ) -> Result<(), AppError> {
        let key = key.into();
        let bytes = serde_json::to_vec(value)?;
        let ks = self.keyspace.clone();
        tokio::task::spawn_blocking(move || ks.insert(key, bytes))
            .await
            .map_err(join_err)?
            .map_err(store_err)
    }

    pub async fn get<V: DeserializeOwned + Send + 'static>(
        &self,
        key: impl Into<Vec<u8>>,
    ) -> Result<Option<V>, AppError> {
        let key = key.into();
        let ks = self.keyspace.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<V>, AppError> {
            match ks.get(key).map_err(store_err)? {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(join_err)?
    }

    pub async fn remove(&self, key: impl Into<Vec<u8>>) -> Result<(), AppError> {
        let key = key.into();
        let ks = self.keyspace.clone();
        tokio::task::spawn_blocking(move || ks.remove(key))
            .await
            .map_err(join_err)?
            .map_err(store_err)
    }

    /// Values in key order, skipping `offset` entries and returning at most
    /// `limit`.
    pub async fn values_page<V: DeserializeOwned + Send + 'static>(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<V>, AppError> {
        let ks = self.keyspace.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<V>, AppError> {
            let mut results = Vec::new();
            for guard in ks.prefix(Vec::<u8>::new()).skip(offset).take(limit) {
                let (_key, value) = guard.into_inner().map_err(store_err)?;
                results.push(serde_json::from_slice(&value)?);
            }
            Ok(results)
        })
        .await
        .map_err(join_err)?
    }

    /// Exact number of stored keys.
    pub async fn count(&self) -> Result<usize, AppError> {
        let ks = self.keyspace.clone();
        tokio::task::spawn_blocking(move || -> Result<usize, AppError> {
            let mut count = 0;
            for guard in ks.prefix(Vec::<u8>::new()) {
                guard.into_inner().map_err(store_err)?;
                count += 1;
            }
            Ok(count)
        })
        .await
        .map_err(join_err)?
    }

    pub(crate) fn raw(&self) -> &fjall::Keyspace {
        &self.keyspace
    }
}

// ---------------------------------------------------------------------------
// WriteBatch
// ---------------------------------------------------------------------------

/// Writes staged across keyspaces and applied together on `commit`.
pub struct WriteBatch {
    batch: fjall::OwnedWriteBatch,
}

impl WriteBatch {
    pub fn insert<V: Serialize>(
        &mut self,
        ks: &KeyspaceHandle,
        key: impl Into<Vec<u8>>,
        value: &V,
    ) -> Result<(), AppError> {
        let bytes = serde_json::to_vec(value)?;
        self.batch.insert(ks.raw(), key.into(), bytes);
        Ok(())
    }

    pub fn remove(&mut self, ks: &KeyspaceHandle, key: impl Into<Vec<u8>>) {
        self.batch.remove(ks.raw(), key.into());
    }

    pub async fn commit(self) -> Result<(), AppError> {
        let batch = self.batch;
        tokio::task::spawn_blocking(move || batch.commit())
            .await
            .map_err(join_err)?
            .map_err(store_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            data_dir: PathBuf::from(dir.path()),
        };
        let store = Store::open(&config).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn insert_and_get_roundtrip() {
        let (store, _dir) = temp_store();
        let ks = store.keyspace("test").unwrap();
        ks.insert("key1", &"hello").await.unwrap();
        let val: Option<String> = ks.get("key1").await.unwrap();
        assert_eq!(val, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let (store, _dir) = temp_store();
        let ks = store.keyspace("test").unwrap();
        let val: Option<String> = ks.get("nonexistent").await.unwrap();
        assert_eq!(val, None);
    }

    #[tokio::test]
    async fn remove_deletes_key() {
        let (store, _dir) = temp_store();
        let ks = store.keyspace("test").unwrap();
        ks.insert("key1", &"hello").await.unwrap();
        ks.remove("key1").await.unwrap();
        assert_eq!(ks.get::<String>("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn batch_spans_keyspaces() {
        let (store, _dir) = temp_store();
        let a = store.keyspace("a").unwrap();
        let b = store.keyspace("b").unwrap();
        b.insert("gone", &1u32).await.unwrap();

        let mut batch = store.batch();
        batch.insert(&a, "k", &"va").unwrap();
        batch.insert(&b, "k", &"vb").unwrap();
        batch.remove(&b, "gone");
        batch.commit().await.unwrap();

        assert_eq!(a.get::<String>("k").await.unwrap().as_deref(), Some("va"));
        assert_eq!(b.get::<String>("k").await.unwrap().as_deref(), Some("vb"));
        assert_eq!(b.get::<u32>("gone").await.unwrap(), None);
    }

    #[tokio::test]
    async fn paging_and_count() {
        let (store, _dir) = temp_store();
        let ks = store.keyspace("test").unwrap();
        for i in 0..5u32 {
            ks.insert(format!("key{i}"), &i).await.unwrap();
        }
        assert_eq!(ks.count().await.unwrap(), 5);

        let page: Vec<u32> = ks.values_page(1, 2).await.unwrap();
        assert_eq!(page, vec![1, 2]);
        let tail: Vec<u32> = ks.values_page(4, 10).await.unwrap();
        assert_eq!(tail, vec![4]);
        let past: Vec<u32> = ks.values_page(9, 10).await.unwrap();
        assert!(past.is_empty());
    }
}
