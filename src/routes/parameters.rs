use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::ApiResult;
use crate::{
    app::AppState,
    domain::{update_parameters, CostParameters},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/parameters", get(current_parameters).put(replace_parameters))
}

#[derive(Debug, Serialize)]
struct ParametersResponse {
    success: bool,
    data: CostParameters,
    recalculated: usize,
    failed: usize,
}

async fn current_parameters(State(state): State<AppState>) -> ApiResult<Json<CostParameters>> {
    Ok(Json(state.store.parameters().await?))
}

/// Replaces the global parameters and re-prices every pending lead.
#[tracing::instrument(skip_all)]
async fn replace_parameters(
    State(state): State<AppState>,
    params: Result<Json<CostParameters>, JsonRejection>,
) -> ApiResult<Json<ParametersResponse>> {
    let Json(params) = params?;
    let (stored, report) = update_parameters(state.store.as_ref(), params).await?;

    Ok(Json(ParametersResponse {
        success: true,
        data: stored,
        recalculated: report.updated,
        failed: report.failed,
    }))
}
