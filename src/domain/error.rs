//! Domain error types

use thiserror::Error;

use super::entities::PropertyId;

/// Failures of the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} does not exist")]
    Missing(PropertyId),
    #[error("record {0} already exists")]
    Duplicate(PropertyId),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Failures of the outbound notification channel. Never fatal to a decision.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification endpoint unreachable: {0}")]
    Transport(String),
    #[error("notification timed out")]
    Timeout,
    #[error("notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Errors surfaced by the lead workflows.
#[derive(Debug, Error)]
pub enum LeadError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("property {0} not found")]
    NotFound(PropertyId),

    #[error("property {id} is already {status}")]
    TerminalRecord { id: PropertyId, status: String },

    /// The priced band is degenerate at approval time; the caller should retry.
    #[error("acquisition price for property {0} is zero; data may not be saved yet, retry shortly")]
    DataIntegrity(PropertyId),

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

/// Result type for domain operations
pub type Result<T> = std::result::Result<T, LeadError>;
