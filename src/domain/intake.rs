//! Lead ingestion: price a freshly received lead and store it as pending.

use time::OffsetDateTime;

use super::{
    entities::{
        AvmQuotes, CostBreakdown, CostOverrides, Lead, PropertyAttributes, PropertyRecord, Status,
    },
    error::Result,
    ports::RecordStore,
};
use crate::util::new_record_id;

/// A lead as mapped from the intake payload, before it has an id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewLead {
    pub lead: Lead,
    pub attributes: PropertyAttributes,
    pub avm: AvmQuotes,
    pub raw_payload: Option<serde_json::Value>,
}

impl NewLead {
    fn into_record(self) -> PropertyRecord {
        let now = OffsetDateTime::now_utc();
        PropertyRecord {
            id: new_record_id(),
            created_at: now,
            updated_at: now,
            lead: self.lead,
            attributes: self.attributes,
            avm: self.avm,
            overrides: CostOverrides::default(),
            breakdown: CostBreakdown::default(),
            status: Status::Pending,
            approved_at: None,
            raw_payload: self.raw_payload,
        }
    }
}

pub async fn ingest(store: &dyn RecordStore, new_lead: NewLead) -> Result<PropertyRecord> {
    let params = store.parameters().await?;
    let mut record = new_lead.into_record();
    record.reprice(&params);

    let record = store.insert(record).await?;
    tracing::info!(
        property_id = %record.id,
        reference_price = record.breakdown.reference_price,
        purchase_price = record.breakdown.purchase_price,
        parameters_version = params.version,
        "ingested lead"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ports::RecordChange, RecordFilter};
    use crate::infra::store::JsonStore;
    use crate::test_support::{sample_parameters, sample_quotes};

    fn new_lead() -> NewLead {
        NewLead {
            lead: Lead {
                first_name: "Paolo".to_string(),
                last_name: "Verdi".to_string(),
                email: "paolo@example.com".to_string(),
                phone: None,
            },
            attributes: PropertyAttributes {
                address: "Via Roma 1, Milano".to_string(),
                surface_sqm: 80.0,
                ..PropertyAttributes::default()
            },
            avm: sample_quotes(),
            raw_payload: Some(serde_json::json!({"lead_nome": "Paolo"})),
        }
    }

    #[tokio::test]
    async fn stores_priced_pending_record() {
        let store = JsonStore::in_memory();
        let params = store.replace_parameters(sample_parameters()).await.unwrap();
        let mut changes = store.subscribe();

        let record = ingest(&store, new_lead()).await.unwrap();

        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.breakdown.parameters_version, params.version);
        assert_eq!(record.breakdown.reference_price, 300_000.0);
        assert!(record.breakdown.purchase_price > 0.0);
        assert!(record.raw_payload.is_some());

        let stored = store.list(&RecordFilter::pending()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, record.id);
        assert!(matches!(changes.try_recv(), Ok(RecordChange::Inserted(_))));
    }

    #[tokio::test]
    async fn lead_without_quotes_is_still_stored() {
        let store = JsonStore::in_memory();
        store.replace_parameters(sample_parameters()).await.unwrap();
        let mut lead = new_lead();
        lead.avm = AvmQuotes::default();

        let record = ingest(&store, lead).await.unwrap();
        assert_eq!(record.breakdown.reference_price, 0.0);
        assert!(store.get(record.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn overflowing_surface_still_reopens_from_snapshot() {
        let path = std::env::temp_dir()
            .join(format!("flip-desk-intake-{}", uuid::Uuid::new_v4()))
            .join("records.json");
        let payload = serde_json::json!({
            "lead_nome": "Nora",
            "superficie_mq": "1e308",
            "avm_agent_pricing_min": 300000,
            "avm_agent_pricing_max": 320000
        });

        let record = {
            let store = JsonStore::open(path.clone()).unwrap();
            store.replace_parameters(sample_parameters()).await.unwrap();
            let new_lead = crate::infra::intake::parse_lead(payload).unwrap();
            ingest(&store, new_lead).await.unwrap()
        };
        assert_eq!(record.breakdown.renovation, 0.0);
        assert!(record.breakdown.purchase_price.is_finite());

        let reopened = JsonStore::open(path.clone()).unwrap();
        let loaded = reopened.get(record.id).await.unwrap().unwrap();
        assert_eq!(loaded.breakdown.renovation, 0.0);
        assert!(loaded.attributes.surface_sqm > 1e307);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
