use serde::Serialize;
use time::OffsetDateTime;

use super::entities::{PropertyId, PropertyRecord, Status};

const RECENT_LIMIT: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecentLead {
    pub id: PropertyId,
    pub name: String,
    pub status: Status,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Share of approved leads over all leads, in percent.
    pub approval_rate_pct: f64,
    pub average_roi_pct: f64,
    /// Sum of purchase prices across approved leads.
    pub portfolio_value: f64,
    pub recent: Vec<RecentLead>,
}

pub fn summarize(records: &[PropertyRecord]) -> AnalyticsSummary {
    let total = records.len();
    let count = |status: Status| records.iter().filter(|r| r.status == status).count();
    let approved = count(Status::Approved);

    if total == 0 {
        return AnalyticsSummary::default();
    }

    let average_roi_pct = records.iter().map(|r| r.breakdown.roi).sum::<f64>() / total as f64;
    let portfolio_value = records
        .iter()
        .filter(|r| r.status == Status::Approved)
        .map(|r| r.breakdown.purchase_price)
        .sum();

    let mut newest: Vec<&PropertyRecord> = records.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent = newest
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|r| RecentLead {
            id: r.id,
            name: r.lead.full_name(),
            status: r.status,
            created_at: r.created_at,
        })
        .collect();

    AnalyticsSummary {
        total,
        pending: count(Status::Pending),
        approved,
        rejected: count(Status::Rejected),
        approval_rate_pct: approved as f64 / total as f64 * 100.0,
        average_roi_pct,
        portfolio_value,
        recent,
    }
}
