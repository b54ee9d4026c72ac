//! Fixtures and test doubles shared by the unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{
    approval::NotificationPayload,
    error::{NotifyError, StoreError},
    ports::{Notifier, RecordChange, RecordStore},
    AvmQuotes, CostBreakdown, CostOverrides, CostParameters, Lead, PropertyAttributes,
    PropertyId, PropertyRecord, RecordFilter, Status,
};
use crate::infra::store::JsonStore;

pub fn sample_parameters() -> CostParameters {
    CostParameters {
        renovation_per_sqm: 500.0,
        technical_study: 2_000.0,
        architect: 3_000.0,
        notary: 2_500.0,
        lawyer: 1_000.0,
        habitability_certificate: 800.0,
        change_of_use: 0.0,
        condominium_heating: 1_200.0,
        site_cleanup: 600.0,
        utilities: 400.0,
        inbound_agency_pct: 3.0,
        outbound_agency_pct: 3.0,
        contingency_pct: 10.0,
        tax_pct: 0.5,
        default_exposure: 100_000.0,
        target_roi_pct: 20.0,
        tax_fixed: 200.0,
        ..CostParameters::default()
    }
}

pub fn sample_quotes() -> AvmQuotes {
    AvmQuotes {
        agent_min: Some(300_000.0),
        agent_max: Some(320_000.0),
        insights_min: None,
        insights_max: Some(310_000.0),
    }
}

/// A record with quotes and an empty breakdown; callers price it as needed.
pub fn sample_record(first_name: &str, status: Status) -> PropertyRecord {
    let now = OffsetDateTime::now_utc();
    PropertyRecord {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        lead: Lead {
            first_name: first_name.to_string(),
            last_name: "Rossi".to_string(),
            email: format!("{}@example.com", first_name.to_lowercase()),
            phone: None,
        },
        attributes: PropertyAttributes {
            address: "Via Garibaldi 12, Torino".to_string(),
            property_type: Some("Appartamento".to_string()),
            surface_sqm: 80.0,
            ..PropertyAttributes::default()
        },
        avm: sample_quotes(),
        overrides: CostOverrides::default(),
        breakdown: CostBreakdown::default(),
        status,
        approved_at: None,
        raw_payload: None,
    }
}

/// Notifier that records payloads and optionally fails.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<NotificationPayload>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<NotificationPayload> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(payload.clone());
        }
        if self.fail {
            Err(NotifyError::Rejected {
                status: 502,
                body: "bad gateway".into(),
            })
        } else {
            Ok(())
        }
    }
}

/// Store wrapper that fails writes to chosen records and can hand out a
/// scripted sequence of reads.
pub struct FlakyStore {
    pub inner: JsonStore,
    pub failing_updates: Vec<PropertyId>,
    pub scripted_reads: Mutex<Vec<Option<PropertyRecord>>>,
    pub reads: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: JsonStore) -> Self {
        Self {
            inner,
            failing_updates: Vec::new(),
            scripted_reads: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn get(&self, id: PropertyId) -> Result<Option<PropertyRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .scripted_reads
            .lock()
            .ok()
            .and_then(|mut reads| (!reads.is_empty()).then(|| reads.remove(0)));
        match scripted {
            Some(read) => Ok(read),
            None => self.inner.get(id).await,
        }
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<PropertyRecord>, StoreError> {
        self.inner.list(filter).await
    }

    async fn insert(&self, record: PropertyRecord) -> Result<PropertyRecord, StoreError> {
        self.inner.insert(record).await
    }

    async fn update(&self, record: PropertyRecord) -> Result<PropertyRecord, StoreError> {
        if self.failing_updates.contains(&record.id) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.inner.update(record).await
    }

    async fn delete(&self, id: PropertyId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn parameters(&self) -> Result<CostParameters, StoreError> {
        self.inner.parameters().await
    }

    async fn replace_parameters(
        &self,
        params: CostParameters,
    ) -> Result<CostParameters, StoreError> {
        self.inner.replace_parameters(params).await
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordChange> {
        self.inner.subscribe()
    }
}
