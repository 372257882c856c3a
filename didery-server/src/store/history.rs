use didery_common::{CurrentState, EventLog, Record};
use tracing::debug;

use super::policy::{self, ConflictMode};
use super::{EVENTS_KEYSPACE, HISTORY_KEYSPACE, KeyGuard, KeyLocks, KeyspaceHandle, Store};
use crate::error::AppError;

/// Current-state projection and full event log for every DID, merged under
/// one conflict mode.
///
/// Writers must hold [`HistoryStore::lock`] for the DID across
/// read → validate → write.
#[derive(Clone)]
pub struct HistoryStore {
    store: Store,
    history: KeyspaceHandle,
    events: KeyspaceHandle,
    mode: ConflictMode,
    locks: KeyLocks,
}

impl HistoryStore {
    pub fn open(store: &Store, mode: ConflictMode) -> Result<Self, AppError> {
        Ok(Self {
            store: store.clone(),
            history: store.keyspace(HISTORY_KEYSPACE)?,
            events: store.keyspace(EVENTS_KEYSPACE)?,
            mode,
            locks: KeyLocks::new(),
        })
    }

    pub fn mode(&self) -> ConflictMode {
        self.mode
    }

    pub async fn lock(&self, did: &str) -> KeyGuard {
        self.locks.lock(did).await
    }

    pub async fn current(&self, did: &str) -> Result<Option<CurrentState>, AppError> {
        self.history.get(did).await
    }

    pub async fn events(&self, did: &str) -> Result<Option<EventLog>, AppError> {
        self.events.get(did).await
    }

    pub async fn current_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CurrentState>, AppError> {
        self.history.values_page(offset, limit).await
    }

    pub async fn events_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<EventLog>, AppError> {
        self.events.values_page(offset, limit).await
    }

    pub async fn count(&self) -> Result<usize, AppError> {
        self.history.count().await
    }

    pub async fn events_count(&self) -> Result<usize, AppError> {
        self.events.count().await
    }

    /// Merge `record` into both projections and write them atomically.
    ///
    /// `current` is the state the caller validated against.
    pub async fn save(
        &self,
        did: &str,
        current: Option<CurrentState>,
        record: Record,
    ) -> Result<(), AppError> {
        let events = self.events(did).await?;
        let next_events = policy::merge_events(self.mode, events, record.clone());
        let next_current = policy::merge_current(self.mode, current, record);

        debug!(
            did = %did,
            mode = %self.mode,
            forks = next_current.records().len(),
            chains = next_events.chains().len(),
            "saving history"
        );

        let mut batch = self.store.batch();
        batch.insert(&self.history, did, &next_current)?;
        batch.insert(&self.events, did, &next_events)?;
        batch.commit().await
    }

    /// Remove the record and chain started by `root`. The DID disappears once
    /// nothing is left under it.
    pub async fn delete_chain(
        &self,
        did: &str,
        current: CurrentState,
        root: &str,
    ) -> Result<(), AppError> {
        let events = self.events(did).await?;
        let mut batch = self.store.batch();

        match policy::remove_current(current, root) {
            Some(state) => batch.insert(&self.history, did, &state)?,
            None => batch.remove(&self.history, did),
        }
        match events.and_then(|log| policy::remove_events(log, root)) {
            Some(log) => batch.insert(&self.events, did, &log)?,
            None => batch.remove(&self.events, did),
        }

        batch.commit().await
    }
}
