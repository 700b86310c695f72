//! Segment browsing and upload handlers.

use axum::{
    Json, Router,
    extract::{RawQuery, State, rejection::JsonRejection},
    routing::get,
};
use serde::Serialize;
use stockplan_core::replenishment::StoreDemandSegment;
use stockplan_core::types::DeliveryOption;

use super::browse::CountResponse;
use crate::error::AppError;
use crate::services::Page;
use crate::state::AppState;

/// Build the segments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stock-planning/delivery-options", get(delivery_options))
        .route(
            "/api/stock-planning/segments",
            get(segments).put(replace_segments),
        )
        .route("/api/stock-planning/segments/count", get(segments_count))
}

/// Parsed segment filter. `delivery` may be repeated.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SegmentQuery {
    pub query: String,
    pub page: Option<u32>,
    pub deliveries: Vec<DeliveryOption>,
}

impl SegmentQuery {
    /// Parse a raw query string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if `page` is not a number.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let mut parsed = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "query" => parsed.query = value.into_owned(),
                "page" => {
                    let page = value
                        .parse()
                        .map_err(|_| AppError::BadRequest(format!("invalid page: {value}")))?;
                    parsed.page = Some(page);
                }
                "delivery" if !value.is_empty() => {
                    parsed.deliveries.push(DeliveryOption::from(value.into_owned()));
                }
                _ => {}
            }
        }
        Ok(parsed)
    }
}

/// Every delivery label in use.
///
/// # Errors
///
/// Returns 500 if the data source fails.
pub async fn delivery_options(
    State(state): State<AppState>,
) -> Result<Json<Vec<DeliveryOption>>, AppError> {
    let options = state.source().fetch_delivery_options().await?;
    Ok(Json(options))
}

/// One page of segments, filtered by SKU or delivery.
///
/// # Errors
///
/// Returns 400 for a malformed page and 500 if the data source fails.
pub async fn segments(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Vec<StoreDemandSegment>>, AppError> {
    let params = SegmentQuery::parse(raw.as_deref().unwrap_or_default())?;
    let segments = state
        .source()
        .fetch_segments(
            &params.query,
            &params.deliveries,
            Page::numbered(params.page),
        )
        .await?;
    Ok(Json(segments))
}

/// Number of segments matching the filter; `page` is ignored.
///
/// # Errors
///
/// Returns 400 for a malformed page and 500 if the data source fails.
pub async fn segments_count(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<CountResponse>, AppError> {
    let params = SegmentQuery::parse(raw.as_deref().unwrap_or_default())?;
    let total_count = state
        .source()
        .count_segments(&params.query, &params.deliveries)
        .await?;
    Ok(Json(CountResponse { total_count }))
}

/// Result of a segmentation upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplaceSegmentsResponse {
    pub replaced: u64,
}

/// Replace the whole segmentation with an uploaded list.
///
/// # Errors
///
/// Returns 400 for a malformed or empty upload, 409 if a SKU appears twice
/// and 500 if the data source fails.
pub async fn replace_segments(
    State(state): State<AppState>,
    body: Result<Json<Vec<StoreDemandSegment>>, JsonRejection>,
) -> Result<Json<ReplaceSegmentsResponse>, AppError> {
    let Json(segments) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    if segments.is_empty() {
        return Err(AppError::BadRequest(
            "segment upload must contain at least one segment".to_string(),
        ));
    }

    let replaced = state.source().replace_segments(&segments).await?;
    tracing::info!(replaced, "Segmentation uploaded");
    Ok(Json(ReplaceSegmentsResponse { replaced }))
}
