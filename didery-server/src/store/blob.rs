use didery_common::BlobRecord;

use super::{BLOBS_KEYSPACE, KeyGuard, KeyLocks, KeyspaceHandle, Store};
use crate::error::AppError;

/// One-time-pad blobs keyed by bare DID.
#[derive(Clone)]
pub struct BlobStore {
    blobs: KeyspaceHandle,
    locks: KeyLocks,
}

impl BlobStore {
    pub fn open(store: &Store) -> Result<Self, AppError> {
        Ok(Self {
            blobs: store.keyspace(BLOBS_KEYSPACE)?,
            locks: KeyLocks::new(),
        })
    }

    pub async fn lock(&self, did: &str) -> KeyGuard {
        self.locks.lock(did).await
    }

    pub async fn get(&self, did: &str) -> Result<Option<BlobRecord>, AppError> {
        self.blobs.get(did).await
    }

    pub async fn put(&self, did: &str, record: &BlobRecord) -> Result<(), AppError> {
        self.blobs.insert(did, record).await
    }

    pub async fn remove(&self, did: &str) -> Result<(), AppError> {
        self.blobs.remove(did).await
    }

    pub async fn page(&self, offset: usize, limit: usize) -> Result<Vec<BlobRecord>, AppError> {
        self.blobs.values_page(offset, limit).await
    }

    pub async fn count(&self) -> Result<usize, AppError> {
        self.blobs.count().await
    }
}
