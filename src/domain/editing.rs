//! Operator edits to a record's quotes and cost overrides.

use serde::{Deserialize, Deserializer};

use super::{
    approval::TerminalRecordPolicy,
    entities::{AvmQuotes, CostOverrides, PropertyId, PropertyRecord},
    error::{LeadError, Result},
    ports::RecordStore,
};

/// Single-field change: absent keeps the stored value, `null` clears it and a
/// number replaces it.
pub type FieldPatch = Option<Option<f64>>;

fn patch<'de, D>(deserializer: D) -> std::result::Result<FieldPatch, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

/// Lowest target ROI that still leaves a positive cost budget.
const MIN_TARGET_ROI_PCT: f64 = -100.0;

fn check_finite(fields: &[(&str, FieldPatch)]) -> Result<()> {
    match fields
        .iter()
        .find(|(_, change)| matches!(change, Some(Some(value)) if !value.is_finite()))
    {
        Some((name, _)) => Err(LeadError::Validation(format!(
            "`{name}` must be a finite number"
        ))),
        None => Ok(()),
    }
}

fn apply(slot: &mut Option<f64>, change: FieldPatch) {
    if let Some(value) = change {
        *slot = value;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AvmEdit {
    #[serde(default, deserialize_with = "patch")]
    pub agent_min: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub agent_max: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub insights_min: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub insights_max: FieldPatch,
}

impl AvmEdit {
    fn validate(&self) -> Result<()> {
        check_finite(&[
            ("agent_min", self.agent_min),
            ("agent_max", self.agent_max),
            ("insights_min", self.insights_min),
            ("insights_max", self.insights_max),
        ])
    }

    fn apply_to(&self, avm: &mut AvmQuotes) {
        apply(&mut avm.agent_min, self.agent_min);
        apply(&mut avm.agent_max, self.agent_max);
        apply(&mut avm.insights_min, self.insights_min);
        apply(&mut avm.insights_max, self.insights_max);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct OverridesEdit {
    #[serde(default, deserialize_with = "patch")]
    pub renovation: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub technical_study: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub architect: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub taxes: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub notary: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub lawyer: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub habitability_certificate: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub change_of_use: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub inbound_agency_fee: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub outbound_agency_fee: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub condominium_heating: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub site_cleanup: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub utilities: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub contingency: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub other: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub exposure: FieldPatch,
    #[serde(default, deserialize_with = "patch")]
    pub target_roi_pct: FieldPatch,
}

impl OverridesEdit {
    fn validate(&self) -> Result<()> {
        check_finite(&[
            ("renovation", self.renovation),
            ("technical_study", self.technical_study),
            ("architect", self.architect),
            ("taxes", self.taxes),
            ("notary", self.notary),
            ("lawyer", self.lawyer),
            ("habitability_certificate", self.habitability_certificate),
            ("change_of_use", self.change_of_use),
            ("inbound_agency_fee", self.inbound_agency_fee),
            ("outbound_agency_fee", self.outbound_agency_fee),
            ("condominium_heating", self.condominium_heating),
            ("site_cleanup", self.site_cleanup),
            ("utilities", self.utilities),
            ("contingency", self.contingency),
            ("other", self.other),
            ("exposure", self.exposure),
            ("target_roi_pct", self.target_roi_pct),
        ])?;
        match self.target_roi_pct {
            Some(Some(roi)) if roi <= MIN_TARGET_ROI_PCT => Err(LeadError::Validation(format!(
                "`target_roi_pct` must be above {MIN_TARGET_ROI_PCT}, got {roi}"
            ))),
            _ => Ok(()),
        }
    }

    fn apply_to(&self, overrides: &mut CostOverrides) {
        apply(&mut overrides.renovation, self.renovation);
        apply(&mut overrides.technical_study, self.technical_study);
        apply(&mut overrides.architect, self.architect);
        apply(&mut overrides.taxes, self.taxes);
        apply(&mut overrides.notary, self.notary);
        apply(&mut overrides.lawyer, self.lawyer);
        apply(
            &mut overrides.habitability_certificate,
            self.habitability_certificate,
        );
        apply(&mut overrides.change_of_use, self.change_of_use);
        apply(&mut overrides.inbound_agency_fee, self.inbound_agency_fee);
        apply(&mut overrides.outbound_agency_fee, self.outbound_agency_fee);
        apply(&mut overrides.condominium_heating, self.condominium_heating);
        apply(&mut overrides.site_cleanup, self.site_cleanup);
        apply(&mut overrides.utilities, self.utilities);
        apply(&mut overrides.contingency, self.contingency);
        apply(&mut overrides.other, self.other);
        apply(&mut overrides.exposure, self.exposure);
        apply(&mut overrides.target_roi_pct, self.target_roi_pct);
    }
}

/// Edit submitted from the detail view.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PropertyEdit {
    #[serde(default)]
    pub avm: Option<AvmEdit>,
    #[serde(default)]
    pub overrides: Option<OverridesEdit>,
}

impl PropertyEdit {
    /// Rejects values the pricing engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if let Some(avm) = &self.avm {
            avm.validate()?;
        }
        if let Some(overrides) = &self.overrides {
            overrides.validate()?;
        }
        Ok(())
    }

    pub fn apply_to(&self, record: &mut PropertyRecord) {
        if let Some(avm) = &self.avm {
            avm.apply_to(&mut record.avm);
        }
        if let Some(overrides) = &self.overrides {
            overrides.apply_to(&mut record.overrides);
        }
    }
}

/// Applies `edit` and re-prices the record against the current parameters.
pub async fn apply_edit(
    store: &dyn RecordStore,
    id: PropertyId,
    edit: &PropertyEdit,
    policy: TerminalRecordPolicy,
) -> Result<PropertyRecord> {
    edit.validate()?;
    let mut record = store.get(id).await?.ok_or(LeadError::NotFound(id))?;
    policy.check(&record)?;

    edit.apply_to(&mut record);
    let params = store.parameters().await?;
    record.reprice(&params);

    let record = store.update(record).await?;
    tracing::info!(
        property_id = %id,
        purchase_price = record.breakdown.purchase_price,
        "applied operator edit"
    );
    Ok(record)
}
