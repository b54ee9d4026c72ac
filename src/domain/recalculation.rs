//! Re-prices pending records whenever the global parameters change.

use serde::Serialize;

use super::{
    entities::{CostParameters, RecordFilter},
    error::{LeadError, Result, StoreError},
    ports::RecordStore,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecalculationReport {
    pub updated: usize,
    pub failed: usize,
}

/// Recomputes every pending record against `params`, keeping its quotes and
/// operator overrides. Records are written as one batch; a record that fails
/// is logged and counted without holding back the others.
pub async fn recalculate_all(
    store: &dyn RecordStore,
    params: &CostParameters,
) -> std::result::Result<RecalculationReport, StoreError> {
    let mut pending = store.list(&RecordFilter::pending()).await?;
    for record in &mut pending {
        record.reprice(params);
    }
    let ids: Vec<_> = pending.iter().map(|record| record.id).collect();
    let mut report = RecalculationReport::default();

    match store.update_many(pending).await {
        Ok(outcomes) => {
            for (id, outcome) in ids.iter().zip(outcomes) {
                match outcome {
                    Ok(_) => report.updated += 1,
                    Err(error) => {
                        tracing::warn!(property_id = %id, %error, "failed to store recalculated breakdown");
                        report.failed += 1;
                    }
                }
            }
        }
        Err(error) => {
            tracing::warn!(records = ids.len(), %error, "failed to store recalculated breakdowns");
            report.failed = ids.len();
        }
    }

    tracing::info!(
        parameters_version = params.version,
        updated = report.updated,
        failed = report.failed,
        "recalculated pending properties"
    );
    Ok(report)
}

/// Every amount and rate must be a finite, non-negative number.
fn check_parameters(params: &CostParameters) -> Result<()> {
    let fields = [
        ("renovation_per_sqm", params.renovation_per_sqm),
        ("technical_study", params.technical_study),
        ("architect", params.architect),
        ("notary", params.notary),
        ("lawyer", params.lawyer),
        ("habitability_certificate", params.habitability_certificate),
        ("change_of_use", params.change_of_use),
        ("condominium_heating", params.condominium_heating),
        ("site_cleanup", params.site_cleanup),
        ("utilities", params.utilities),
        ("inbound_agency_pct", params.inbound_agency_pct),
        ("outbound_agency_pct", params.outbound_agency_pct),
        ("contingency_pct", params.contingency_pct),
        ("tax_pct", params.tax_pct),
        ("default_exposure", params.default_exposure),
        ("target_roi_pct", params.target_roi_pct),
        ("tax_fixed", params.tax_fixed),
    ];
    match fields
        .iter()
        .find(|(_, value)| !value.is_finite() || *value < 0.0)
    {
        Some((name, value)) => Err(LeadError::Validation(format!(
            "parameter `{name}` must be a non-negative number, got {value}"
        ))),
        None => Ok(()),
    }
}

/// Persists a new parameter set, then re-prices pending records with it.
///
/// Nothing is recalculated when the parameter write fails.
pub async fn update_parameters(
    store: &dyn RecordStore,
    params: CostParameters,
) -> Result<(CostParameters, RecalculationReport)> {
    check_parameters(&params)?;
    let stored = store.replace_parameters(params).await?;
    tracing::info!(version = stored.version, "stored cost parameters");
    let report = recalculate_all(store, &stored).await?;
    Ok((stored, report))
}
