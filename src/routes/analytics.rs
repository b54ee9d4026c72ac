use axum::{extract::State, routing::get, Json, Router};

use super::ApiResult;
use crate::{
    app::AppState,
    domain::{summarize, AnalyticsSummary, RecordFilter},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/analytics", get(analytics))
}

async fn analytics(State(state): State<AppState>) -> ApiResult<Json<AnalyticsSummary>> {
    let records = state.store.list(&RecordFilter::default()).await?;
    Ok(Json(summarize(&records)))
}
