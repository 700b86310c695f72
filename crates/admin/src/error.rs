//! Unified error handling for the planning service.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::replenishment::RecordError;
use crate::services::planning::PlanningError;

/// Application-level error type for the planning service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Gathering planning inputs failed.
    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    /// A replenishment record failed validation.
    #[error("Invalid replenishment record: {0}")]
    Record(#[from] RecordError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(RepositoryError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Planning(_) => StatusCode::BAD_GATEWAY,
            Self::Record(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Planning request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(detail)) => format!("Conflict: {detail}"),
            Self::Database(RepositoryError::Database(_)) => "Internal server error".to_string(),
            Self::Planning(_) => "Planning data source unavailable".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
