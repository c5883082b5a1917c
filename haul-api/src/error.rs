use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use haul_core::{CoreError, StoreError};
use haul_order::{LifecycleError, PackingError, ValidationResult};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    /// Batch failed the packing rules; the body carries the full diagnostics.
    Rejected(Box<ValidationResult>),
    NotFoundError(String),
    ConflictError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Rejected(result) => {
                let body = Json(json!({
                    "error": result.message,
                    "reasons": result.reasons(),
                    "validation": result,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFoundError(msg),
            StoreError::Conflict(msg) => AppError::ConflictError(msg),
            StoreError::Unavailable(_) | StoreError::Corrupt(_) => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { .. } => AppError::ConflictError(err.to_string()),
            LifecycleError::UnknownStatus(e) => AppError::ValidationError(e.to_string()),
            LifecycleError::Store(e) => e.into(),
        }
    }
}

impl From<PackingError> for AppError {
    fn from(err: PackingError) -> Self {
        match err {
            PackingError::Rejected(result) => AppError::Rejected(result),
            PackingError::NotFound(id) => AppError::NotFoundError(format!("Packing not found: {}", id)),
            PackingError::Lifecycle(e) => e.into(),
            PackingError::Store(e) => e.into(),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::ValidationError(msg),
            CoreError::InternalError(msg) => AppError::InternalServerError(msg),
        }
    }
}
