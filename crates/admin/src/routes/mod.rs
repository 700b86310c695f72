//! HTTP route handlers for the planning service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                          - Liveness check
//! GET  /health/ready                                    - Readiness check (database)
//!
//! # Planning
//! POST /api/stock-planning/replenishment                - Compute a plan
//! GET  /api/stock-planning/delivery-options             - Delivery labels in use
//! GET  /api/stock-planning/segments                     - Browse segments (paginated)
//! GET  /api/stock-planning/segments/count               - Segment count
//! PUT  /api/stock-planning/segments                     - Replace the segmentation
//!
//! # Input browsing (paginated, each with a /count companion)
//! GET  /api/stock-planning/sales                        - Sales per SKU in a window
//! GET  /api/stock-planning/central-stock                - Central warehouse stock
//! GET  /api/stock-planning/store-stock                  - Store stock
//!
//! # Replenishment records
//! GET    /api/stock-planning/replenishments             - List records
//! POST   /api/stock-planning/replenishments             - Commit a plan
//! GET    /api/stock-planning/replenishments/{id}        - Record header
//! DELETE /api/stock-planning/replenishments/{id}        - Delete a record
//! GET    /api/stock-planning/replenishments/{id}/lines  - Lines, optionally grouped
//! GET    /api/stock-planning/replenishments/{id}/summary - Totals per store
//! GET    /api/stock-planning/replenishments/{id}/segmentation - Segments planned with
//! ```

pub mod api;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

/// Build the complete application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(api::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the record store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
