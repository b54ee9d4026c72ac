use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiError, ApiResult};
use crate::{
    app::AppState,
    domain::{AcquisitionBand, Decision, PropertyRecord},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/approve", post(approve))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApproveRequest {
    #[serde(default, alias = "property_id")]
    property_id: Option<String>,
    #[serde(default, alias = "status")]
    decision: Option<String>,
}

impl ApproveRequest {
    fn validate(self) -> ApiResult<(Uuid, Decision)> {
        let raw_id = self
            .property_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::validation("missing required field `propertyId`"))?;
        let raw_decision = self
            .decision
            .filter(|decision| !decision.trim().is_empty())
            .ok_or_else(|| ApiError::validation("missing required field `decision`"))?;

        let id = Uuid::parse_str(raw_id.trim())
            .map_err(|_| ApiError::validation(format!("invalid property id `{raw_id}`")))?;
        let decision = raw_decision.parse::<Decision>().map_err(|_| {
            ApiError::validation(format!(
                "invalid decision `{raw_decision}`, expected `approved` or `rejected`"
            ))
        })?;
        Ok((id, decision))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApproveResponse {
    success: bool,
    data: PropertyRecord,
    acquisition_price: AcquisitionBand,
    email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_error: Option<String>,
}

/// Records the operator's decision and notifies the lead.
#[tracing::instrument(skip_all)]
async fn approve(
    State(state): State<AppState>,
    request: Result<Json<ApproveRequest>, JsonRejection>,
) -> ApiResult<Json<ApproveResponse>> {
    let Json(request) = request?;
    let (id, decision) = request.validate()?;

    let outcome = state.workflow.decide(id, decision).await?;

    Ok(Json(ApproveResponse {
        success: true,
        data: outcome.record,
        acquisition_price: outcome.band,
        email_sent: outcome.email_sent,
        email_error: outcome.email_error,
    }))
}
