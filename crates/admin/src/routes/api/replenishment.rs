//! Planning and replenishment record handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockplan_core::replenishment::{
    AllocationOutcome, GroupBy, ReplenishmentSummary, StoreDemandSegment, StorePriority,
    group_lines,
};
use stockplan_core::types::{DeliveryOption, PlanningWindow, ReplenishmentId, Sku};

use crate::error::AppError;
use crate::models::replenishment::{
    CommitOutcome, NewReplenishmentRecord, RecordPage, ReplenishmentRecord,
    SaveReplenishmentRequest,
};
use crate::services::{PlanRequest, clamp_paging};
use crate::state::AppState;

/// Build the replenishment router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stock-planning/replenishment", post(plan))
        .route(
            "/api/stock-planning/replenishments",
            get(list_records).post(save_record),
        )
        .route(
            "/api/stock-planning/replenishments/{id}",
            get(get_record).delete(delete_record),
        )
        .route("/api/stock-planning/replenishments/{id}/lines", get(record_lines))
        .route(
            "/api/stock-planning/replenishments/{id}/summary",
            get(record_summary),
        )
        .route(
            "/api/stock-planning/replenishments/{id}/segmentation",
            get(record_segmentation),
        )
}

// =============================================================================
// Planning
// =============================================================================

/// Body of a planning request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanBody {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub selected_delivery_options: Vec<DeliveryOption>,
    #[serde(default)]
    pub edited_segments: Vec<StoreDemandSegment>,
    #[serde(default)]
    pub store_priority: StorePriority,
    #[serde(default)]
    pub query: String,
}

/// A computed plan with its totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    #[serde(flatten)]
    pub outcome: AllocationOutcome,
    pub summary: ReplenishmentSummary,
    pub dropped_edits: Vec<Sku>,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn parse_id(raw: &str) -> Result<ReplenishmentId, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid replenishment id: {raw}")))
}

/// Compute a replenishment plan.
///
/// An empty `storePriority` falls back to the configured default order.
///
/// # Errors
///
/// Returns 400 for a malformed body, an inverted window or no stores to
/// plan for, and 502 if the planning inputs cannot be read.
pub async fn plan(
    State(state): State<AppState>,
    body: Result<Json<PlanBody>, JsonRejection>,
) -> Result<Json<PlanResponse>, AppError> {
    let body = json_body(body)?;

    let window = PlanningWindow::new(body.start_date, body.end_date)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let priority = if body.store_priority.is_empty() {
        state.planning().default_store_priority.clone()
    } else {
        body.store_priority
    };
    if priority.is_empty() {
        return Err(AppError::BadRequest(
            "storePriority must list at least one store".to_string(),
        ));
    }

    let request = PlanRequest {
        window,
        query: body.query,
        delivery_options: body.selected_delivery_options,
        edited_segments: body.edited_segments,
        priority,
    };
    let plan = state.planner().plan(&request).await?;

    Ok(Json(PlanResponse {
        outcome: plan.outcome,
        summary: plan.summary,
        dropped_edits: plan.dropped_edits,
    }))
}

// =============================================================================
// Records
// =============================================================================

/// Query parameters for listing records.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub query: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// List committed records, newest first.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<RecordPage>, AppError> {
    let (page, limit) = clamp_paging(params.page, params.limit);
    let records = state.store().list(&params.query, page, limit).await?;
    Ok(Json(records))
}

/// Commit a plan as a replenishment record.
///
/// Responds 201 when the record was written and 200 when a record with the
/// same ID already existed, with `Location` pointing at the record either way.
///
/// # Errors
///
/// Returns 400 if the record fails validation.
pub async fn save_record(
    State(state): State<AppState>,
    body: Result<Json<SaveReplenishmentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let record = NewReplenishmentRecord::validate(json_body(body)?)?;
    let outcome = state.store().save(&record).await?;

    let status = match outcome {
        CommitOutcome::Created(_) => StatusCode::CREATED,
        CommitOutcome::AlreadyExists(_) => StatusCode::OK,
    };
    let location = format!("/api/stock-planning/replenishments/{}", outcome.id());
    Ok((status, [(header::LOCATION, location)], Json(outcome)))
}

/// Record header.
///
/// # Errors
///
/// Returns 404 if the record does not exist.
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReplenishmentRecord>, AppError> {
    let record = state.store().get(parse_id(&id)?).await?;
    Ok(Json(record))
}

/// Delete a record with its lines.
///
/// # Errors
///
/// Returns 404 if the record does not exist.
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store().delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for record lines.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinesQuery {
    pub group_by: Option<String>,
}

/// Record lines, raw or grouped by store or SKU.
///
/// # Errors
///
/// Returns 400 for an unknown `groupBy` and 404 if the record does not exist.
pub async fn record_lines(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LinesQuery>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let group_by = params
        .group_by
        .as_deref()
        .map(str::parse::<GroupBy>)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let store = state.store();
    let (_, lines) = tokio::try_join!(store.get(id), store.lines(id))?;

    Ok(match group_by {
        Some(by) => Json(group_lines(&lines, by)).into_response(),
        None => Json(lines).into_response(),
    })
}

/// Totals recomputed from a record's persisted lines.
///
/// # Errors
///
/// Returns 404 if the record does not exist.
pub async fn record_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReplenishmentSummary>, AppError> {
    let id = parse_id(&id)?;
    let store = state.store();
    let (_, lines, breaks) = tokio::try_join!(store.get(id), store.lines(id), store.breaks(id))?;

    Ok(Json(ReplenishmentSummary::from_lines(&lines, &breaks)))
}

/// Segment targets a record was planned with.
///
/// # Errors
///
/// Returns 404 if the record does not exist.
pub async fn record_segmentation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StoreDemandSegment>>, AppError> {
    let id = parse_id(&id)?;
    let store = state.store();
    let (_, segments) = tokio::try_join!(store.get(id), store.segmentation(id))?;

    Ok(Json(segments))
}
