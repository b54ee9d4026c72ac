//! Approval workflow: moves a pending lead to a terminal status and notifies
//! the lead through the outbound channel.

use std::{str::FromStr, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{
    entities::{Decision, PropertyId, PropertyRecord, Status},
    error::{LeadError, Result, StoreError},
    ports::{Notifier, RecordStore},
    pricing::AcquisitionBand,
};

const UNSPECIFIED_PROPERTY_TYPE: &str = "Not specified";

/// Bounded re-read used to ride out a just-written record that is not yet
/// visible with its final breakdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Whether records that already reached a terminal status may change again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalRecordPolicy {
    /// Edits and new decisions are accepted on any record.
    #[default]
    Open,
    /// Approved and rejected records are read-only.
    Frozen,
}

impl TerminalRecordPolicy {
    /// Fails with [`LeadError::TerminalRecord`] when `record` may not change.
    pub fn check(&self, record: &PropertyRecord) -> Result<()> {
        match self {
            TerminalRecordPolicy::Frozen if record.status.is_terminal() => {
                Err(LeadError::TerminalRecord {
                    id: record.id,
                    status: record.status.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for TerminalRecordPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(TerminalRecordPolicy::Open),
            "frozen" => Ok(TerminalRecordPolicy::Frozen),
            other => Err(format!("unknown terminal record policy `{other}`")),
        }
    }
}

/// Body posted to the notification webhook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub status: Status,
    pub lead_email: String,
    pub lead_first_name: String,
    pub lead_last_name: String,
    pub address: String,
    pub property_type: String,
    pub surface_sqm: f64,
    pub acquisition_price_min: i64,
    pub acquisition_price_max: i64,
}

impl NotificationPayload {
    pub fn new(record: &PropertyRecord, band: AcquisitionBand) -> Self {
        Self {
            status: record.status,
            lead_email: record.lead.email.clone(),
            lead_first_name: record.lead.first_name.clone(),
            lead_last_name: record.lead.last_name.clone(),
            address: record.attributes.address.clone(),
            property_type: record
                .attributes
                .property_type
                .clone()
                .filter(|kind| !kind.trim().is_empty())
                .unwrap_or_else(|| UNSPECIFIED_PROPERTY_TYPE.to_string()),
            surface_sqm: record.attributes.surface_sqm,
            acquisition_price_min: band.min,
            acquisition_price_max: band.max,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApprovalOutcome {
    pub record: PropertyRecord,
    pub band: AcquisitionBand,
    pub email_sent: bool,
    pub email_error: Option<String>,
}

/// A record is priced once it has a reference price and non-negative
/// purchase prices.
fn is_priced(record: &PropertyRecord) -> bool {
    let breakdown = &record.breakdown;
    let non_negative = |value: f64| value.is_finite() && value >= 0.0;
    breakdown.reference_price > 0.0
        && non_negative(breakdown.purchase_price)
        && non_negative(breakdown.purchase_price_minus_5pct)
}

#[derive(Clone)]
pub struct ApprovalWorkflow {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    policy: TerminalRecordPolicy,
}

impl ApprovalWorkflow {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            retry: RetryPolicy::default(),
            policy: TerminalRecordPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_policy(mut self, policy: TerminalRecordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Applies `decision` to the record and notifies the lead.
    ///
    /// A notification failure does not undo the status change; it is reported
    /// through [`ApprovalOutcome::email_sent`].
    pub async fn decide(&self, id: PropertyId, decision: Decision) -> Result<ApprovalOutcome> {
        tracing::info!(property_id = %id, %decision, "processing decision");

        let approving = decision == Decision::Approved;
        let mut record = self.fetch_fresh(id, approving).await?;
        self.policy.check(&record)?;

        let band = if approving {
            AcquisitionBand::from_breakdown(&record.breakdown)
        } else {
            AcquisitionBand::ZERO
        };

        if approving && band.is_zero() {
            tracing::error!(
                property_id = %id,
                purchase_price = record.breakdown.purchase_price,
                purchase_price_minus_5pct = record.breakdown.purchase_price_minus_5pct,
                "refusing approval with a zero acquisition price"
            );
            return Err(LeadError::DataIntegrity(id));
        }

        let now = OffsetDateTime::now_utc();
        record.status = decision.into();
        record.updated_at = now;
        record.approved_at = approving.then_some(now);
        let record = self.store.update(record).await?;
        tracing::info!(property_id = %id, status = %record.status, "status updated");

        let payload = NotificationPayload::new(&record, band);
        let (email_sent, email_error) = match self.notifier.notify(&payload).await {
            Ok(()) => {
                tracing::info!(property_id = %id, "notification sent");
                (true, None)
            }
            Err(error) => {
                tracing::warn!(property_id = %id, %error, "notification failed, status kept");
                (false, Some(error.to_string()))
            }
        };

        Ok(ApprovalOutcome {
            record,
            band,
            email_sent,
            email_error,
        })
    }

    /// Reads the record up to `retry.attempts` times. When `require_priced`,
    /// the first priced read wins; otherwise the last one read is used.
    async fn fetch_fresh(&self, id: PropertyId, require_priced: bool) -> Result<PropertyRecord> {
        let attempts = self.retry.attempts.max(1);
        let mut last_seen: Option<PropertyRecord> = None;
        let mut last_error: Option<StoreError> = None;

        for attempt in 1..=attempts {
            match self.store.get(id).await {
                Ok(Some(record)) => {
                    last_error = None;
                    if !require_priced || is_priced(&record) {
                        return Ok(record);
                    }
                    tracing::debug!(property_id = %id, attempt, "breakdown not priced yet");
                    last_seen = Some(record);
                }
                Ok(None) => {
                    last_error = None;
                    tracing::debug!(property_id = %id, attempt, "record not visible yet");
                }
                Err(error) => {
                    tracing::warn!(property_id = %id, attempt, %error, "record read failed");
                    last_error = Some(error);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.retry.delay).await;
            }
        }

        if let Some(record) = last_seen {
            tracing::warn!(property_id = %id, "using last read after exhausting retries");
            return Ok(record);
        }

        match last_error {
            Some(error) => Err(error.into()),
            None => Err(LeadError::NotFound(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::store::JsonStore;
    use crate::test_support::{sample_parameters, sample_record, FlakyStore, RecordingNotifier};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            delay: Duration::ZERO,
        }
    }

    async fn priced(store: &dyn RecordStore, name: &str, status: Status) -> PropertyRecord {
        let mut record = sample_record(name, status);
        record.reprice(&sample_parameters());
        store.insert(record).await.unwrap()
    }

    fn workflow(store: Arc<dyn RecordStore>, notifier: Arc<RecordingNotifier>) -> ApprovalWorkflow {
        ApprovalWorkflow::new(store, notifier).with_retry(fast_retry())
    }

    #[tokio::test]
    async fn approval_updates_status_and_notifies_band() {
        let store = Arc::new(JsonStore::in_memory());
        let notifier = Arc::new(RecordingNotifier::default());
        let record = priced(store.as_ref(), "Anna", Status::Pending).await;

        let outcome = workflow(store.clone(), notifier.clone())
            .decide(record.id, Decision::Approved)
            .await
            .unwrap();

        assert!(outcome.email_sent);
        assert_eq!(outcome.record.status, Status::Approved);
        assert!(outcome.record.approved_at.is_some());
        assert_eq!(
            outcome.band,
            AcquisitionBand {
                min: 183_000,
                max: 193_000
            }
        );

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].status, Status::Approved);
        assert_eq!(sent[0].acquisition_price_min, 183_000);
        assert_eq!(sent[0].acquisition_price_max, 193_000);
        assert_eq!(sent[0].lead_email, "anna@example.com");
        assert_eq!(sent[0].property_type, "Appartamento");

        let stored = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Approved);
    }

    #[tokio::test]
    async fn zero_band_blocks_approval_and_keeps_pending() {
        let store = Arc::new(FlakyStore::new(JsonStore::in_memory()));
        let notifier = Arc::new(RecordingNotifier::default());
        let record = store
            .insert(sample_record("Bruno", Status::Pending))
            .await
            .unwrap();

        let err = workflow(store.clone(), notifier.clone())
            .decide(record.id, Decision::Approved)
            .await
            .unwrap_err();

        assert!(matches!(err, LeadError::DataIntegrity(id) if id == record.id));
        assert_eq!(store.reads(), 3);
        assert!(notifier.sent().is_empty());
        let stored = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Pending);
    }

    #[tokio::test]
    async fn failed_notification_keeps_approval() {
        let store = Arc::new(JsonStore::in_memory());
        let notifier = Arc::new(RecordingNotifier::failing());
        let record = priced(store.as_ref(), "Carla", Status::Pending).await;

        let outcome = workflow(store.clone(), notifier)
            .decide(record.id, Decision::Approved)
            .await
            .unwrap();

        assert!(!outcome.email_sent);
        assert!(outcome.email_error.is_some());
        let stored = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Approved);
    }

    #[tokio::test]
    async fn rejection_reports_zero_band() {
        let store = Arc::new(JsonStore::in_memory());
        let notifier = Arc::new(RecordingNotifier::default());
        let record = priced(store.as_ref(), "Dario", Status::Pending).await;

        let outcome = workflow(store.clone(), notifier.clone())
            .decide(record.id, Decision::Rejected)
            .await
            .unwrap();

        assert_eq!(outcome.record.status, Status::Rejected);
        assert!(outcome.record.approved_at.is_none());
        assert!(outcome.band.is_zero());
        let sent = notifier.sent();
        assert_eq!(sent[0].status, Status::Rejected);
        assert_eq!(sent[0].acquisition_price_max, 0);
    }

    #[tokio::test]
    async fn unknown_property_is_not_found() {
        let store = Arc::new(JsonStore::in_memory());
        let notifier = Arc::new(RecordingNotifier::default());
        let id = uuid::Uuid::new_v4();

        let err = workflow(store, notifier)
            .decide(id, Decision::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn retry_waits_for_priced_breakdown() {
        let store = Arc::new(FlakyStore::new(JsonStore::in_memory()));
        let notifier = Arc::new(RecordingNotifier::default());
        let record = priced(store.as_ref(), "Elena", Status::Pending).await;

        let mut stale = record.clone();
        stale.breakdown = Default::default();
        if let Ok(mut reads) = store.scripted_reads.lock() {
            reads.push(Some(stale));
        }

        let outcome = workflow(store.clone(), notifier)
            .decide(record.id, Decision::Approved)
            .await
            .unwrap();

        assert_eq!(store.reads(), 2);
        assert_eq!(outcome.band.max, 193_000);
    }

    #[tokio::test]
    async fn frozen_policy_blocks_new_decisions() {
        let store = Arc::new(JsonStore::in_memory());
        let notifier = Arc::new(RecordingNotifier::default());
        let record = priced(store.as_ref(), "Franca", Status::Approved).await;

        let err = workflow(store.clone(), notifier.clone())
            .with_policy(TerminalRecordPolicy::Frozen)
            .decide(record.id, Decision::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::TerminalRecord { .. }));

        let reopened = workflow(store, notifier)
            .decide(record.id, Decision::Rejected)
            .await
            .unwrap();
        assert_eq!(reopened.record.status, Status::Rejected);
    }
}
