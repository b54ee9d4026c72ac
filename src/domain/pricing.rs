//! Pricing engine: turns property attributes, AVM quotes and the global cost
//! parameters into a full [`CostBreakdown`].
//!
//! Everything here is pure. Monetary values stay unrounded `f64`; the only
//! rounding in the crate is [`round_to_thousand`], applied when a stored
//! breakdown is turned into an [`AcquisitionBand`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::entities::{
    AvmQuotes, CostBreakdown, CostOverrides, CostParameters, InboundFeeMode, PropertyAttributes,
    PropertyRecord,
};

/// Share of the purchase price kept as the negotiation floor.
const NEGOTIATION_FLOOR: f64 = 0.95;

/// Treats absent, zero, negative and non-finite quotes as "not supplied" (0).
fn supplied(value: Option<f64>) -> f64 {
    value
        .filter(|price| price.is_finite() && *price > 0.0)
        .unwrap_or(0.0)
}

fn pct(value: f64, percentage: f64) -> f64 {
    value * (percentage / 100.0)
}

/// Overflowed or undefined amounts count as 0.
fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Lowest strictly positive quote, or 0 when there is none.
pub fn reference_price(avm: &AvmQuotes) -> f64 {
    avm.all()
        .into_iter()
        .map(supplied)
        .filter(|price| *price > 0.0)
        .min_by(f64::total_cmp)
        .unwrap_or(0.0)
}

/// Mean of two values when both are nonzero, else whichever is nonzero.
fn blend(a: f64, b: f64) -> f64 {
    match (a > 0.0, b > 0.0) {
        (true, true) => (a + b) / 2.0,
        (true, false) => a,
        (false, true) => b,
        (false, false) => 0.0,
    }
}

/// Average of one provider's min/max band.
pub fn source_average(min: Option<f64>, max: Option<f64>) -> f64 {
    blend(supplied(min), supplied(max))
}

/// Blended resale estimate across both providers.
pub fn resale_price(avm: &AvmQuotes) -> f64 {
    let agent = source_average(avm.agent_min, avm.agent_max);
    let insights = source_average(avm.insights_min, avm.insights_max);
    blend(agent, insights)
}

/// Line items after applying operator overrides over the derived defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedCosts {
    pub renovation: f64,
    pub technical_study: f64,
    pub architect: f64,
    pub taxes: f64,
    pub notary: f64,
    pub lawyer: f64,
    pub habitability_certificate: f64,
    pub change_of_use: f64,
    pub inbound_agency_fee: f64,
    pub outbound_agency_fee: f64,
    pub condominium_heating: f64,
    pub site_cleanup: f64,
    pub utilities: f64,
    pub contingency: f64,
    pub other: f64,
    pub exposure: f64,
    pub target_roi_pct: f64,
}

impl ResolvedCosts {
    /// Resolves every line item once: operator value if present, else the
    /// default derived from `params`.
    pub fn resolve(
        attrs: &PropertyAttributes,
        params: &CostParameters,
        overrides: &CostOverrides,
        reference_price: f64,
        resale_price: f64,
    ) -> Self {
        let exposure = finite(overrides.exposure.unwrap_or(params.default_exposure));
        let target_roi_pct = finite(overrides.target_roi_pct.unwrap_or(params.target_roi_pct));

        let surface = if attrs.surface_sqm.is_finite() && attrs.surface_sqm > 0.0 {
            attrs.surface_sqm
        } else {
            0.0
        };
        let renovation = finite(
            overrides
                .renovation
                .unwrap_or(params.renovation_per_sqm * surface),
        );

        let inbound_default = match params.inbound_fee_mode {
            InboundFeeMode::Waived => 0.0,
            InboundFeeMode::PercentOfReference => {
                pct(reference_price, params.inbound_agency_pct)
            }
        };

        Self {
            renovation,
            technical_study: overrides.technical_study.unwrap_or(params.technical_study),
            architect: overrides.architect.unwrap_or(params.architect),
            taxes: overrides
                .taxes
                .unwrap_or(pct(exposure, params.tax_pct) + params.tax_fixed),
            notary: overrides.notary.unwrap_or(params.notary),
            lawyer: overrides.lawyer.unwrap_or(params.lawyer),
            habitability_certificate: overrides
                .habitability_certificate
                .unwrap_or(params.habitability_certificate),
            change_of_use: overrides.change_of_use.unwrap_or(params.change_of_use),
            inbound_agency_fee: overrides.inbound_agency_fee.unwrap_or(inbound_default),
            outbound_agency_fee: overrides
                .outbound_agency_fee
                .unwrap_or(pct(resale_price, params.outbound_agency_pct)),
            condominium_heating: overrides
                .condominium_heating
                .unwrap_or(params.condominium_heating),
            site_cleanup: overrides.site_cleanup.unwrap_or(params.site_cleanup),
            utilities: overrides.utilities.unwrap_or(params.utilities),
            contingency: overrides
                .contingency
                .unwrap_or(pct(renovation, params.contingency_pct)),
            other: overrides.other.unwrap_or(0.0),
            exposure,
            target_roi_pct,
        }
        .sanitized()
    }

    fn sanitized(self) -> Self {
        Self {
            renovation: finite(self.renovation),
            technical_study: finite(self.technical_study),
            architect: finite(self.architect),
            taxes: finite(self.taxes),
            notary: finite(self.notary),
            lawyer: finite(self.lawyer),
            habitability_certificate: finite(self.habitability_certificate),
            change_of_use: finite(self.change_of_use),
            inbound_agency_fee: finite(self.inbound_agency_fee),
            outbound_agency_fee: finite(self.outbound_agency_fee),
            condominium_heating: finite(self.condominium_heating),
            site_cleanup: finite(self.site_cleanup),
            utilities: finite(self.utilities),
            contingency: finite(self.contingency),
            other: finite(self.other),
            exposure: self.exposure,
            target_roi_pct: self.target_roi_pct,
        }
    }

    pub fn total(&self) -> f64 {
        finite(self.renovation
            + self.technical_study
            + self.architect
            + self.taxes
            + self.notary
            + self.lawyer
            + self.habitability_certificate
            + self.change_of_use
            + self.inbound_agency_fee
            + self.outbound_agency_fee
            + self.condominium_heating
            + self.site_cleanup
            + self.utilities
            + self.contingency
            + self.other)
    }
}

/// Computes the full breakdown for one property.
///
/// Never fails: a negative purchase price is a valid, unprofitable result.
pub fn compute(
    attrs: &PropertyAttributes,
    avm: &AvmQuotes,
    params: &CostParameters,
    overrides: Option<&CostOverrides>,
) -> CostBreakdown {
    let overrides = overrides.copied().unwrap_or_default();

    let reference_price = reference_price(avm);
    let resale_price = resale_price(avm);
    let costs = ResolvedCosts::resolve(attrs, params, &overrides, reference_price, resale_price);

    let total_cost_excluding_purchase = costs.total();
    let total_resale = resale_price;
    // A target ROI at or below -100% leaves no budget.
    let roi_factor = 1.0 + costs.target_roi_pct / 100.0;
    let total_cost = if roi_factor > 0.0 {
        finite(total_resale / roi_factor)
    } else {
        0.0
    };
    let purchase_price = finite(total_cost - total_cost_excluding_purchase);
    let gross_profit = finite(total_resale - total_cost);
    let roe = if costs.exposure > 0.0 {
        finite(gross_profit / costs.exposure * 100.0)
    } else {
        0.0
    };

    CostBreakdown {
        reference_price,
        resale_price,
        renovation: costs.renovation,
        technical_study: costs.technical_study,
        architect: costs.architect,
        taxes: costs.taxes,
        notary: costs.notary,
        lawyer: costs.lawyer,
        habitability_certificate: costs.habitability_certificate,
        change_of_use: costs.change_of_use,
        inbound_agency_fee: costs.inbound_agency_fee,
        outbound_agency_fee: costs.outbound_agency_fee,
        condominium_heating: costs.condominium_heating,
        site_cleanup: costs.site_cleanup,
        utilities: costs.utilities,
        contingency: costs.contingency,
        other: costs.other,
        total_cost_excluding_purchase,
        total_cost,
        total_resale,
        purchase_price,
        purchase_price_minus_5pct: finite(purchase_price * NEGOTIATION_FLOOR),
        gross_profit,
        exposure: costs.exposure,
        roi: costs.target_roi_pct,
        roe,
        parameters_version: params.version,
    }
}

impl PropertyRecord {
    /// Recomputes the stored breakdown from the record's own quotes and
    /// overrides. Every call site that prices a record goes through here.
    pub fn reprice(&mut self, params: &CostParameters) {
        self.breakdown = compute(&self.attributes, &self.avm, params, Some(&self.overrides));
        self.updated_at = OffsetDateTime::now_utc();
    }
}

/// Rounds half-up to the nearest thousand: a remainder of 500 or more goes
/// up, anything below goes down.
pub fn round_to_thousand(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let remainder = value.rem_euclid(1000.0);
    if remainder >= 500.0 {
        value - remainder + 1000.0
    } else {
        value - remainder
    }
}

/// Acquisition price range quoted to the lead, in whole currency units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionBand {
    pub min: i64,
    pub max: i64,
}

impl AcquisitionBand {
    pub const ZERO: AcquisitionBand = AcquisitionBand { min: 0, max: 0 };

    /// Rounds the stored purchase prices to thousands, clamped at zero.
    pub fn from_breakdown(breakdown: &CostBreakdown) -> Self {
        Self {
            min: to_whole(round_to_thousand(breakdown.purchase_price_minus_5pct)),
            max: to_whole(round_to_thousand(breakdown.purchase_price)),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.min == 0 && self.max == 0
    }
}

fn to_whole(value: f64) -> i64 {
    value.max(0.0) as i64
}
