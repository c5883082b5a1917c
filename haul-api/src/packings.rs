use std::convert::Infallible;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use haul_core::{ActorRole, Destination, Packing, WarehouseStore};
use haul_order::ValidationResult;
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::{staff_auth_middleware, StaffClaims}, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PackingRequest {
    pub destination: String,
    pub tracking_codes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PackingResponse {
    pub id: Uuid,
    pub destination: String,
    pub tracking_codes: Vec<String>,
    pub status: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

impl From<Packing> for PackingResponse {
    fn from(packing: Packing) -> Self {
        Self {
            id: packing.id,
            destination: packing.destination.to_string(),
            tracking_codes: packing.tracking_codes.iter().map(|c| c.to_string()).collect(),
            status: packing.status.to_string(),
            created_by: packing.created_by.to_string(),
            created_at: packing.created_at,
            dispatched_at: packing.dispatched_at,
        }
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/packings", post(create_packing))
        .route("/v1/packings/check", post(check_packing))
        .route("/v1/packings/stream", get(packing_stream))
        .route("/v1/packings/{id}", get(get_packing))
        .route("/v1/packings/{id}/dispatch", post(dispatch_packing))
        .route_layer(middleware::from_fn_with_state(state, staff_auth_middleware))
}

fn actor_role(claims: &StaffClaims) -> Result<ActorRole, AppError> {
    Ok(ActorRole::new(claims.role.as_str())?)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/packings/check
/// Read-only; a batch that cannot be packed still answers 200.
async fn check_packing(
    State(state): State<AppState>,
    Json(req): Json<PackingRequest>,
) -> Result<Json<ValidationResult>, AppError> {
    let destination = Destination::parse(&req.destination)?;
    let result = state.validation.check(&destination, &req.tracking_codes).await?;
    Ok(Json(result))
}

/// POST /v1/packings
async fn create_packing(
    State(state): State<AppState>,
    Extension(claims): Extension<StaffClaims>,
    Json(req): Json<PackingRequest>,
) -> Result<(StatusCode, Json<PackingResponse>), AppError> {
    let actor = actor_role(&claims)?;
    let destination = Destination::parse(&req.destination)?;

    tracing::info!(
        "{} ({}) creating packing for {} with {} code(s)",
        claims.sub,
        actor,
        destination,
        req.tracking_codes.len()
    );

    let packing = state
        .consolidator
        .create(&destination, &req.tracking_codes, &actor)
        .await?;

    Ok((StatusCode::CREATED, Json(packing.into())))
}

/// GET /v1/packings/{id}
async fn get_packing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PackingResponse>, AppError> {
    let packing = state
        .warehouse
        .get_packing(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Packing not found: {}", id)))?;
    Ok(Json(packing.into()))
}

/// POST /v1/packings/{id}/dispatch
async fn dispatch_packing(
    State(state): State<AppState>,
    Extension(claims): Extension<StaffClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PackingResponse>, AppError> {
    let actor = actor_role(&claims)?;
    let packing = state.consolidator.dispatch(id, &actor).await?;
    Ok(Json(packing.into()))
}

/// GET /v1/packings/stream
/// Server-sent events for committed packings. Lagging clients skip what they missed.
async fn packing_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.events_tx.subscribe()).filter_map(|result| {
        let event = result.ok()?;
        let name = match &event {
            haul_shared::PackingEvent::Created(_) => "packing_created",
            haul_shared::PackingEvent::Dispatched(_) => "packing_dispatched",
        };
        Event::default().event(name).json_data(&event).ok().map(Ok)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
