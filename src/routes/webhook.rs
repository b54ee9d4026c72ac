use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use super::{ApiError, ApiResult};
use crate::{app::AppState, domain::ingest, infra::intake::parse_lead};

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(receive_lead))
}

/// Intake endpoint called by the form tool for every new lead.
#[tracing::instrument(skip_all)]
async fn receive_lead(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(payload) = payload?;
    let new_lead = parse_lead(payload).map_err(ApiError::validation)?;
    let record = ingest(state.store.as_ref(), new_lead).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": record })),
    ))
}
