use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, ApiResult};
use crate::{
    app::AppState,
    domain::{apply_edit, LeadError, PropertyEdit, PropertyRecord, RecordFilter, Status},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/properties", get(list_properties))
        .route(
            "/properties/{id}",
            get(get_property)
                .patch(edit_property)
                .delete(delete_property),
        )
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    status: Option<String>,
    q: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> ApiResult<RecordFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                raw.parse::<Status>()
                    .map_err(|err| ApiError::validation(err.to_string()))?,
            ),
        };
        Ok(RecordFilter {
            status,
            query: self.q,
        })
    }
}

async fn list_properties(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<PropertyRecord>>> {
    let Query(query) = query?;
    let records = state.store.list(&query.into_filter()?).await?;
    Ok(Json(records))
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::validation(format!("invalid property id `{raw}`")))
}

async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PropertyRecord>> {
    let id = parse_id(&id)?;
    let record = state
        .store
        .get(id)
        .await?
        .ok_or(LeadError::NotFound(id))?;
    Ok(Json(record))
}

/// Operator edit of quotes and cost overrides; the record is re-priced.
#[tracing::instrument(skip(state, edit))]
async fn edit_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
    edit: Result<Json<PropertyEdit>, JsonRejection>,
) -> ApiResult<Json<PropertyRecord>> {
    let id = parse_id(&id)?;
    let Json(edit) = edit?;
    let record = apply_edit(state.store.as_ref(), id, &edit, state.policy).await?;
    Ok(Json(record))
}

async fn delete_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    if state.store.delete(id).await? {
        tracing::info!(property_id = %id, "deleted property");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(LeadError::NotFound(id).into())
    }
}
