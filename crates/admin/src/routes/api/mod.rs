//! JSON API for stock planning.

pub mod browse;
pub mod replenishment;
pub mod segments;

use axum::{Router, extract::DefaultBodyLimit};

use crate::state::AppState;

/// Largest accepted request body. Committed plans carry every line.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(browse::router())
        .merge(replenishment::router())
        .merge(segments::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
