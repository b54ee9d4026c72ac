use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::util::version::BuildInfo;

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    tracing::trace!("health check requested");
    Json(json!({
        "status": "ok",
        "build": BuildInfo::current(),
    }))
}
