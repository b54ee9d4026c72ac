//! Record store kept in memory and mirrored to a JSON snapshot on disk.

use std::{collections::BTreeMap, path::PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::{broadcast, RwLock};

use crate::domain::{
    error::StoreError,
    ports::{RecordChange, RecordStore},
    CostParameters, PropertyId, PropertyRecord, RecordFilter,
};
use crate::util::persistence::{load_snapshot, save_snapshot, PersistError};

const CHANGE_FEED_CAPACITY: usize = 256;

/// Everything the store persists.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub parameters: CostParameters,
    #[serde(default)]
    pub records: BTreeMap<PropertyId, PropertyRecord>,
}

impl From<PersistError> for StoreError {
    fn from(value: PersistError) -> Self {
        match value {
            PersistError::Io(err) => StoreError::Io(err),
            PersistError::Serde(err) => StoreError::Serde(err),
        }
    }
}

pub struct JsonStore {
    state: RwLock<PersistedState>,
    snapshot: Option<PathBuf>,
    changes: broadcast::Sender<RecordChange>,
}

impl JsonStore {
    /// Store without a backing file.
    pub fn in_memory() -> Self {
        Self::with_state(PersistedState::default(), None)
    }

    /// Opens (or creates) the snapshot at `path`.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let state = match load_snapshot::<PersistedState>(&path)? {
            Some(state) => {
                tracing::info!(
                    path = %path.display(),
                    records = state.records.len(),
                    parameters_version = state.parameters.version,
                    "loaded record snapshot"
                );
                state
            }
            None => {
                tracing::info!(path = %path.display(), "no record snapshot found, starting empty");
                PersistedState::default()
            }
        };
        Ok(Self::with_state(state, Some(path)))
    }

    pub fn with_state(state: PersistedState, snapshot: Option<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            state: RwLock::new(state),
            snapshot,
            changes,
        }
    }

    /// Applies `mutate` to a copy of the state, persists it, then swaps it in.
    /// A failed write leaves the in-memory state untouched.
    async fn commit<R>(
        &self,
        mutate: impl FnOnce(&mut PersistedState) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let out = mutate(&mut next)?;

        if let Some(path) = &self.snapshot {
            save_snapshot(path, &next)?;
        }

        *guard = next;
        Ok(out)
    }

    fn publish(&self, change: RecordChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl RecordStore for JsonStore {
    async fn get(&self, id: PropertyId) -> Result<Option<PropertyRecord>, StoreError> {
        Ok(self.state.read().await.records.get(&id).cloned())
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<PropertyRecord>, StoreError> {
        let state = self.state.read().await;
        let mut records: Vec<PropertyRecord> = state
            .records
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn insert(&self, record: PropertyRecord) -> Result<PropertyRecord, StoreError> {
        let stored = self
            .commit(|state| {
                if state.records.contains_key(&record.id) {
                    return Err(StoreError::Duplicate(record.id));
                }
                state.records.insert(record.id, record.clone());
                Ok(record)
            })
            .await?;
        self.publish(RecordChange::Inserted(stored.clone()));
        Ok(stored)
    }

    async fn update(&self, record: PropertyRecord) -> Result<PropertyRecord, StoreError> {
        let stored = self
            .commit(|state| match state.records.get_mut(&record.id) {
                Some(slot) => {
                    *slot = record.clone();
                    Ok(record)
                }
                None => Err(StoreError::Missing(record.id)),
            })
            .await?;
        self.publish(RecordChange::Updated(stored.clone()));
        Ok(stored)
    }

    /// One snapshot write for the whole batch.
    async fn update_many(
        &self,
        records: Vec<PropertyRecord>,
    ) -> Result<Vec<Result<PropertyRecord, StoreError>>, StoreError> {
        let outcomes = self
            .commit(|state| {
                Ok(records
                    .into_iter()
                    .map(|record| match state.records.get_mut(&record.id) {
                        Some(slot) => {
                            *slot = record.clone();
                            Ok(record)
                        }
                        None => Err(StoreError::Missing(record.id)),
                    })
                    .collect::<Vec<_>>())
            })
            .await?;
        for stored in outcomes.iter().flatten() {
            self.publish(RecordChange::Updated(stored.clone()));
        }
        Ok(outcomes)
    }

    async fn delete(&self, id: PropertyId) -> Result<bool, StoreError> {
        let removed = self
            .commit(|state| Ok(state.records.remove(&id).is_some()))
            .await?;
        if removed {
            self.publish(RecordChange::Deleted(id));
        }
        Ok(removed)
    }

    async fn parameters(&self) -> Result<CostParameters, StoreError> {
        Ok(self.state.read().await.parameters.clone())
    }

    async fn replace_parameters(
        &self,
        params: CostParameters,
    ) -> Result<CostParameters, StoreError> {
        let stored = self
            .commit(|state| {
                let next = CostParameters {
                    version: state.parameters.version + 1,
                    updated_at: OffsetDateTime::now_utc(),
                    ..params
                };
                state.parameters = next.clone();
                Ok(next)
            })
            .await?;
        self.publish(RecordChange::ParametersUpdated(stored.clone()));
        Ok(stored)
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordChange> {
        self.changes.subscribe()
    }
}
