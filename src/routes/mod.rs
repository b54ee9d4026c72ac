//! HTTP surface of the service.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;

use crate::{
    app::AppState,
    domain::{LeadError, StoreError},
};

mod analytics;
mod approve;
mod events;
mod health;
mod parameters;
mod properties;
mod webhook;


/// Seconds a client should wait before retrying a 503.
const RETRY_AFTER_SECS: &str = "1";

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(webhook::router())
        .merge(properties::router())
        .merge(parameters::router())
        .merge(approve::router())
        .merge(analytics::router())
        .merge(events::router())
        .with_state(state)
        .merge(health::router())
}

/// Error returned by every handler; rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError(LeadError);

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self(LeadError::Validation(message.into()))
    }
}

impl From<LeadError> for ApiError {
    fn from(value: LeadError) -> Self {
        Self(value)
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        Self(LeadError::Persistence(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::validation(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::validation(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LeadError::Validation(_) => StatusCode::BAD_REQUEST,
            LeadError::NotFound(_) => StatusCode::NOT_FOUND,
            LeadError::TerminalRecord { .. } => StatusCode::CONFLICT,
            LeadError::DataIntegrity(_) => StatusCode::SERVICE_UNAVAILABLE,
            LeadError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = ?self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }

        let mut response = (status, Json(json!({ "error": self.0.to_string() }))).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_static(RETRY_AFTER_SECS),
            );
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
