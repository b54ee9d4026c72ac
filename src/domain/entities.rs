use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Identifier of a stored property record.
pub type PropertyId = Uuid;

/// Contact details of the person who submitted the lead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Lead {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Physical description of the property.
///
/// Only `surface_sqm` takes part in the pricing math; the rest is carried for
/// the operator and the outbound notification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyAttributes {
    pub address: String,
    #[serde(default)]
    pub street_number: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    /// Surface area in square meters. Zero when the lead did not supply it.
    pub surface_sqm: f64,
    #[serde(default)]
    pub rooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub outdoor_areas: Option<String>,
    #[serde(default)]
    pub appurtenances: Option<String>,
    #[serde(default)]
    pub year_built: Option<String>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub elevator: Option<String>,
}

/// Price quotes from the automated valuation providers.
///
/// Absent, zero, negative and non-finite values all mean "not supplied".
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AvmQuotes {
    #[serde(default)]
    pub agent_min: Option<f64>,
    #[serde(default)]
    pub agent_max: Option<f64>,
    #[serde(default)]
    pub insights_min: Option<f64>,
    #[serde(default)]
    pub insights_max: Option<f64>,
}

impl AvmQuotes {
    /// All four quotes, missing ones as `None`.
    pub fn all(&self) -> [Option<f64>; 4] {
        [
            self.agent_min,
            self.agent_max,
            self.insights_min,
            self.insights_max,
        ]
    }
}

/// How the inbound agency fee line item is charged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundFeeMode {
    /// Modeled but never charged.
    #[default]
    Waived,
    /// Reference price times the inbound agency percentage.
    PercentOfReference,
}

/// Global cost and return parameters, stored as a single versioned record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostParameters {
    #[serde(default)]
    pub version: u64,
    #[serde(default = "OffsetDateTime::now_utc", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    pub renovation_per_sqm: f64,
    pub technical_study: f64,
    pub architect: f64,
    pub notary: f64,
    pub lawyer: f64,
    pub habitability_certificate: f64,
    pub change_of_use: f64,
    pub condominium_heating: f64,
    pub site_cleanup: f64,
    pub utilities: f64,

    pub inbound_agency_pct: f64,
    pub outbound_agency_pct: f64,
    pub contingency_pct: f64,
    pub tax_pct: f64,

    pub default_exposure: f64,
    pub target_roi_pct: f64,
    pub tax_fixed: f64,

    #[serde(default)]
    pub inbound_fee_mode: InboundFeeMode,
}

impl Default for CostParameters {
    fn default() -> Self {
        Self {
            version: 0,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            renovation_per_sqm: 0.0,
            technical_study: 0.0,
            architect: 0.0,
            notary: 0.0,
            lawyer: 0.0,
            habitability_certificate: 0.0,
            change_of_use: 0.0,
            condominium_heating: 0.0,
            site_cleanup: 0.0,
            utilities: 0.0,
            inbound_agency_pct: 0.0,
            outbound_agency_pct: 0.0,
            contingency_pct: 0.0,
            tax_pct: 0.0,
            default_exposure: 0.0,
            target_roi_pct: 0.0,
            tax_fixed: 0.0,
            inbound_fee_mode: InboundFeeMode::Waived,
        }
    }
}

/// Operator-entered values that take precedence over the derived defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CostOverrides {
    #[serde(default)]
    pub renovation: Option<f64>,
    #[serde(default)]
    pub technical_study: Option<f64>,
    #[serde(default)]
    pub architect: Option<f64>,
    #[serde(default)]
    pub taxes: Option<f64>,
    #[serde(default)]
    pub notary: Option<f64>,
    #[serde(default)]
    pub lawyer: Option<f64>,
    #[serde(default)]
    pub habitability_certificate: Option<f64>,
    #[serde(default)]
    pub change_of_use: Option<f64>,
    #[serde(default)]
    pub inbound_agency_fee: Option<f64>,
    #[serde(default)]
    pub outbound_agency_fee: Option<f64>,
    #[serde(default)]
    pub condominium_heating: Option<f64>,
    #[serde(default)]
    pub site_cleanup: Option<f64>,
    #[serde(default)]
    pub utilities: Option<f64>,
    #[serde(default)]
    pub contingency: Option<f64>,
    #[serde(default)]
    pub other: Option<f64>,
    #[serde(default)]
    pub exposure: Option<f64>,
    #[serde(default)]
    pub target_roi_pct: Option<f64>,
}

/// Full financial picture of one property, as produced by the pricing engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub reference_price: f64,
    pub resale_price: f64,

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

    pub total_cost_excluding_purchase: f64,
    pub total_cost: f64,
    pub total_resale: f64,
    pub purchase_price: f64,
    pub purchase_price_minus_5pct: f64,
    pub gross_profit: f64,
    pub exposure: f64,
    /// Target ROI percentage the breakdown was computed with.
    pub roi: f64,
    pub roe: f64,

    /// Version of the cost parameters this breakdown was computed against.
    #[serde(default)]
    pub parameters_version: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Pending)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "approved" => Ok(Status::Approved),
            "rejected" => Ok(Status::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Operator verdict on a pending lead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for Status {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Approved => Status::Approved,
            Decision::Rejected => Status::Rejected,
        }
    }
}

impl FromStr for Decision {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<Status>()? {
            Status::Approved => Ok(Decision::Approved),
            Status::Rejected => Ok(Decision::Rejected),
            Status::Pending => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Status::from(*self).fmt(f)
    }
}

/// A lead as stored by the record store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: PropertyId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    pub lead: Lead,
    pub attributes: PropertyAttributes,
    #[serde(default)]
    pub avm: AvmQuotes,
    #[serde(default)]
    pub overrides: CostOverrides,
    pub breakdown: CostBreakdown,

    #[serde(default)]
    pub status: Status,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,

    /// Payload exactly as received by the intake webhook.
    #[serde(default)]
    pub raw_payload: Option<serde_json::Value>,
}

/// Selection criteria for listing records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub status: Option<Status>,
    /// Case-insensitive match against name, email and address.
    pub query: Option<String>,
}

impl RecordFilter {
    pub fn pending() -> Self {
        Self {
            status: Some(Status::Pending),
            query: None,
        }
    }

    pub fn matches(&self, record: &PropertyRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }

        match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => {
                let needle = query.to_lowercase();
                [
                    record.lead.first_name.as_str(),
                    record.lead.last_name.as_str(),
                    record.lead.email.as_str(),
                    record.attributes.address.as_str(),
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}
