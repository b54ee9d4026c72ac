//! Domain logic for lead pricing and approval lives here.

pub mod analytics;
pub mod approval;
pub mod editing;
pub mod entities;
pub mod error;
pub mod intake;
pub mod ports;
pub mod pricing;
pub mod recalculation;

pub use analytics::{summarize, AnalyticsSummary, RecentLead};
pub use approval::{
    ApprovalOutcome, ApprovalWorkflow, NotificationPayload, RetryPolicy, TerminalRecordPolicy,
};
pub use editing::{apply_edit, PropertyEdit};
pub use entities::{
    AvmQuotes, CostBreakdown, CostOverrides, CostParameters, Decision, InboundFeeMode, Lead,
    PropertyAttributes, PropertyId, PropertyRecord, RecordFilter, Status,
};
pub use error::{LeadError, NotifyError, StoreError};
pub use intake::{ingest, NewLead};
pub use pricing::{compute, round_to_thousand, AcquisitionBand};
pub use recalculation::{recalculate_all, update_parameters, RecalculationReport};
