use axum::{
    extract::{Path, State},
    middleware,
    routing::get,
    Json, Router,
};
use haul_core::{ProcessLogEntry, StatusDomain, Subject};
use serde::Serialize;

use crate::{error::AppError, middleware::auth::staff_auth_middleware, state::AppState};

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub subject: Subject,
    pub entries: Vec<ProcessLogEntry>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/process-log/{domain}/{id}", get(history))
        .route_layer(middleware::from_fn_with_state(state, staff_auth_middleware))
}

/// GET /v1/process-log/{domain}/{id}
async fn history(
    State(state): State<AppState>,
    Path((domain, id)): Path<(String, String)>,
) -> Result<Json<HistoryResponse>, AppError> {
    let domain: StatusDomain = domain.parse().map_err(AppError::ValidationError)?;
    let subject = Subject::new(domain, id);
    let entries = state.recorder.history(&subject).await?;

    Ok(Json(HistoryResponse { subject, entries }))
}
