//! Paginated browsing of the planning inputs.
//!
//! Each listing has a `/count` companion returning how many SKUs the listing
//! pages over, so the planning screen can size its pager.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockplan_core::replenishment::{CentralStock, SalesRecord, StoreStockStatus};
use stockplan_core::types::PlanningWindow;

use crate::error::AppError;
use crate::services::Page;
use crate::state::AppState;

/// Build the browse router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stock-planning/sales", get(sales))
        .route("/api/stock-planning/sales/count", get(sales_count))
        .route("/api/stock-planning/central-stock", get(central_stock))
        .route("/api/stock-planning/central-stock/count", get(central_stock_count))
        .route("/api/stock-planning/store-stock", get(store_stock))
        .route("/api/stock-planning/store-stock/count", get(store_stock_count))
}

/// Total for a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub total_count: i64,
}

/// SKU filter and page for stock listings.
#[derive(Debug, Default, Deserialize)]
pub struct BrowseQuery {
    #[serde(default)]
    pub query: String,
    pub page: Option<u32>,
}

/// SKU filter, page and window for sales listings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesQuery {
    #[serde(default)]
    pub query: String,
    pub page: Option<u32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SalesQuery {
    fn window(&self) -> Result<PlanningWindow, AppError> {
        PlanningWindow::new(self.start_date, self.end_date)
            .map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

// =============================================================================
// Sales
// =============================================================================

/// One page of sales per SKU and store within a window.
///
/// # Errors
///
/// Returns 400 for missing or inverted dates and 500 if the data source fails.
pub async fn sales(
    State(state): State<AppState>,
    params: Result<Query<SalesQuery>, QueryRejection>,
) -> Result<Json<Vec<SalesRecord>>, AppError> {
    let params = query_params(params)?;
    let window = params.window()?;
    let records = state
        .source()
        .fetch_sales(&params.query, &window, Page::numbered(params.page))
        .await?;
    Ok(Json(records))
}

/// Number of SKUs sold within a window.
///
/// # Errors
///
/// Returns 400 for missing or inverted dates and 500 if the data source fails.
pub async fn sales_count(
    State(state): State<AppState>,
    params: Result<Query<SalesQuery>, QueryRejection>,
) -> Result<Json<CountResponse>, AppError> {
    let params = query_params(params)?;
    let window = params.window()?;
    let total_count = state.source().count_sales(&params.query, &window).await?;
    Ok(Json(CountResponse { total_count }))
}

// =============================================================================
// Stock
// =============================================================================

/// One page of central warehouse stock.
///
/// # Errors
///
/// Returns 500 if the data source fails.
pub async fn central_stock(
    State(state): State<AppState>,
    params: Result<Query<BrowseQuery>, QueryRejection>,
) -> Result<Json<Vec<CentralStock>>, AppError> {
    let params = query_params(params)?;
    let stock = state
        .source()
        .fetch_central_stock(&params.query, Page::numbered(params.page))
        .await?;
    Ok(Json(stock))
}

/// Number of SKUs with central warehouse stock.
///
/// # Errors
///
/// Returns 500 if the data source fails.
pub async fn central_stock_count(
    State(state): State<AppState>,
    params: Result<Query<BrowseQuery>, QueryRejection>,
) -> Result<Json<CountResponse>, AppError> {
    let params = query_params(params)?;
    let total_count = state.source().count_central_stock(&params.query).await?;
    Ok(Json(CountResponse { total_count }))
}

/// One page of store stock.
///
/// # Errors
///
/// Returns 500 if the data source fails.
pub async fn store_stock(
    State(state): State<AppState>,
    params: Result<Query<BrowseQuery>, QueryRejection>,
) -> Result<Json<Vec<StoreStockStatus>>, AppError> {
    let params = query_params(params)?;
    let stock = state
        .source()
        .fetch_store_stock(&params.query, Page::numbered(params.page))
        .await?;
    Ok(Json(stock))
}

/// Number of SKUs with store stock.
///
/// # Errors
///
/// Returns 500 if the data source fails.
pub async fn store_stock_count(
    State(state): State<AppState>,
    params: Result<Query<BrowseQuery>, QueryRejection>,
) -> Result<Json<CountResponse>, AppError> {
    let params = query_params(params)?;
    let total_count = state.source().count_store_stock(&params.query).await?;
    Ok(Json(CountResponse { total_count }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_count_response_wire_shape() {
        let json = serde_json::to_value(CountResponse { total_count: 12 }).unwrap();
        assert_eq!(json, serde_json::json!({ "totalCount": 12 }));
    }

    #[test]
    fn test_sales_query_rejects_inverted_window() {
        let params = SalesQuery {
            query: String::new(),
            page: None,
            start_date: "2026-09-30".parse().unwrap(),
            end_date: "2026-09-01".parse().unwrap(),
        };
        assert!(matches!(params.window(), Err(AppError::BadRequest(_))));
    }
}
