//! Ports implemented by the infrastructure adapters.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

use super::{
    approval::NotificationPayload,
    entities::{CostParameters, PropertyId, PropertyRecord, RecordFilter},
    error::{NotifyError, StoreError},
};

/// Change feed emitted by a [`RecordStore`] after every committed write.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum RecordChange {
    Inserted(PropertyRecord),
    Updated(PropertyRecord),
    Deleted(PropertyId),
    ParametersUpdated(CostParameters),
}

/// Keyed store for property records and the cost parameter singleton.
///
/// Each write is atomic for a single record.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn get(&self, id: PropertyId) -> Result<Option<PropertyRecord>, StoreError>;

    /// Records matching `filter`, newest first.
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<PropertyRecord>, StoreError>;

    async fn insert(&self, record: PropertyRecord) -> Result<PropertyRecord, StoreError>;

    /// Replaces an existing record. Fails with [`StoreError::Missing`] for unknown ids.
    async fn update(&self, record: PropertyRecord) -> Result<PropertyRecord, StoreError>;

    /// Replaces several existing records at once. The outer error means the
    /// batch as a whole was not stored; otherwise there is one outcome per
    /// record, in input order.
    async fn update_many(
        &self,
        records: Vec<PropertyRecord>,
    ) -> Result<Vec<Result<PropertyRecord, StoreError>>, StoreError> {
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            outcomes.push(self.update(record).await);
        }
        Ok(outcomes)
    }

    /// Returns whether a record was removed.
    async fn delete(&self, id: PropertyId) -> Result<bool, StoreError>;

    async fn parameters(&self) -> Result<CostParameters, StoreError>;

    /// Stores a new parameter set, bumping its version.
    async fn replace_parameters(
        &self,
        params: CostParameters,
    ) -> Result<CostParameters, StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<RecordChange>;
}

/// Outbound notification channel for decided leads.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError>;
}
