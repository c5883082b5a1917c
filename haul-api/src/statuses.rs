use axum::{
    extract::{Path, Query},
    routing::get,
    Json, Router,
};
use haul_core::{StatusDomain, StatusMeta, StatusRegistry};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct CatalogueResponse {
    pub domain: StatusDomain,
    pub statuses: Vec<StatusMeta>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub domain: StatusDomain,
    pub from: String,
    pub to: String,
    pub allowed: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/statuses/{domain}", get(catalogue))
        .route("/v1/statuses/{domain}/transitions", get(check_transition))
}

fn parse_domain(raw: &str) -> Result<StatusDomain, AppError> {
    raw.parse().map_err(AppError::ValidationError)
}

/// GET /v1/statuses/{domain}
async fn catalogue(Path(domain): Path<String>) -> Result<Json<CatalogueResponse>, AppError> {
    let domain = parse_domain(&domain)?;
    Ok(Json(CatalogueResponse {
        domain,
        statuses: StatusRegistry::catalogue(domain),
    }))
}

/// GET /v1/statuses/{domain}/transitions?from=..&to=..
/// Unknown codes are a 400; a known but disallowed edge is `allowed: false`.
async fn check_transition(
    Path(domain): Path<String>,
    Query(query): Query<TransitionQuery>,
) -> Result<Json<TransitionResponse>, AppError> {
    let domain = parse_domain(&domain)?;
    let allowed = StatusRegistry::is_valid_transition(domain, &query.from, &query.to)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    Ok(Json(TransitionResponse {
        domain,
        from: query.from,
        to: query.to,
        allowed,
    }))
}
