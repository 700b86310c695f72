//! Replenishment planning: gather inputs, merge edits, allocate, summarize.
//!
//! The four reads behind a plan are independent, so [`InputAggregator`] issues
//! them concurrently. Gathering is all-or-nothing: if any read fails the plan
//! fails and nothing is allocated.

use std::sync::Arc;

use async_trait::async_trait;
use stockplan_core::replenishment::{
    AllocationOutcome, CentralStock, EditMergePolicy, PlanningInputs, ReplenishmentSummary,
    SalesRecord, StoreDemandSegment, StorePriority, StoreStockStatus, allocate,
    merge_edited_segments,
};
use stockplan_core::types::{DeliveryOption, PlanningWindow, Sku};
use thiserror::Error;

use crate::db::RepositoryError;

/// Rows per page for paginated reads.
pub const PAGE_SIZE: u32 = 10;

/// Which slice of a SKU-ordered result to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    /// Every SKU. Planning always reads everything.
    #[default]
    All,
    /// One-based page of [`PAGE_SIZE`] SKUs.
    Number(u32),
}

impl Page {
    /// Page for an optional one-based page number; missing or zero reads page 1.
    #[must_use]
    pub fn numbered(page: Option<u32>) -> Self {
        Self::Number(page.unwrap_or(1).max(1))
    }

    /// SQL `LIMIT`; `None` binds as `NULL`, which Postgres treats as no limit.
    #[must_use]
    pub fn limit(self) -> Option<i64> {
        match self {
            Self::All => None,
            Self::Number(_) => Some(i64::from(PAGE_SIZE)),
        }
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub fn offset(self) -> i64 {
        match self {
            Self::All => 0,
            Self::Number(n) => i64::from(n.max(1) - 1) * i64::from(PAGE_SIZE),
        }
    }

    /// Apply the page to an already ordered list.
    #[must_use]
    pub fn slice<T>(self, items: Vec<T>) -> Vec<T> {
        match self {
            Self::All => items,
            Self::Number(n) => {
                let skip = (n.max(1) - 1) as usize * PAGE_SIZE as usize;
                items.into_iter().skip(skip).take(PAGE_SIZE as usize).collect()
            }
        }
    }
}

/// Read side of planning: where sales, stock and segmentation come from.
///
/// `query` filters SKUs by substring, case-insensitively; empty matches all.
#[async_trait]
pub trait PlanningDataSource: Send + Sync {
    /// Sales per SKU and store within `window`.
    async fn fetch_sales(
        &self,
        query: &str,
        window: &PlanningWindow,
        page: Page,
    ) -> Result<Vec<SalesRecord>, RepositoryError>;

    /// Stock at the central warehouse per SKU.
    async fn fetch_central_stock(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Vec<CentralStock>, RepositoryError>;

    /// Available and ordered stock per SKU and store.
    async fn fetch_store_stock(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Vec<StoreStockStatus>, RepositoryError>;

    /// Segments, restricted to `deliveries` unless it is empty.
    async fn fetch_segments(
        &self,
        query: &str,
        deliveries: &[DeliveryOption],
        page: Page,
    ) -> Result<Vec<StoreDemandSegment>, RepositoryError>;

    /// Every delivery label in use.
    async fn fetch_delivery_options(&self) -> Result<Vec<DeliveryOption>, RepositoryError>;

    /// Number of SKUs [`fetch_sales`](Self::fetch_sales) pages over.
    async fn count_sales(
        &self,
        query: &str,
        window: &PlanningWindow,
    ) -> Result<i64, RepositoryError>;

    /// Number of SKUs with central stock.
    async fn count_central_stock(&self, query: &str) -> Result<i64, RepositoryError>;

    /// Number of SKUs with store stock.
    async fn count_store_stock(&self, query: &str) -> Result<i64, RepositoryError>;

    /// Number of segments [`fetch_segments`](Self::fetch_segments) pages over.
    async fn count_segments(
        &self,
        query: &str,
        deliveries: &[DeliveryOption],
    ) -> Result<i64, RepositoryError>;

    /// Replace the whole segmentation with `segments`, returning how many
    /// were stored.
    ///
    /// Two segments for one SKU are a `RepositoryError::Conflict`; the
    /// existing segmentation is then left as it was.
    async fn replace_segments(
        &self,
        segments: &[StoreDemandSegment],
    ) -> Result<u64, RepositoryError>;
}

/// Errors raised while planning.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// One of the input reads failed.
    #[error("failed to fetch planning inputs: {0}")]
    Fetch(#[from] RepositoryError),
}

/// Everything needed to compute one plan.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub window: PlanningWindow,
    pub query: String,
    pub delivery_options: Vec<DeliveryOption>,
    pub edited_segments: Vec<StoreDemandSegment>,
    pub priority: StorePriority,
}

/// Inputs ready for allocation.
#[derive(Debug, Clone)]
pub struct GatheredInputs {
    pub inputs: PlanningInputs,
    /// SKUs whose edits were discarded by the merge policy.
    pub dropped_edits: Vec<Sku>,
}

/// Fetches and merges the four planning inputs.
#[derive(Clone)]
pub struct InputAggregator {
    source: Arc<dyn PlanningDataSource>,
    policy: EditMergePolicy,
}

impl InputAggregator {
    /// Create an aggregator over a data source.
    #[must_use]
    pub fn new(source: Arc<dyn PlanningDataSource>, policy: EditMergePolicy) -> Self {
        Self { source, policy }
    }

    /// Fetch sales, central stock, store stock and segments concurrently,
    /// then apply the request's segment edits.
    ///
    /// # Errors
    ///
    /// Returns `PlanningError::Fetch` if any of the four reads fails.
    pub async fn gather(&self, request: &PlanRequest) -> Result<GatheredInputs, PlanningError> {
        let query = request.query.as_str();
        let (sales, central, store_stock, fetched) = tokio::try_join!(
            self.source.fetch_sales(query, &request.window, Page::All),
            self.source.fetch_central_stock(query, Page::All),
            self.source.fetch_store_stock(query, Page::All),
            self.source
                .fetch_segments(query, &request.delivery_options, Page::All),
        )?;

        tracing::debug!(
            sales = sales.len(),
            central = central.len(),
            store_stock = store_stock.len(),
            segments = fetched.len(),
            "Fetched planning inputs"
        );

        let merged = merge_edited_segments(fetched, request.edited_segments.clone(), self.policy);
        if !merged.dropped.is_empty() {
            tracing::warn!(
                policy = %self.policy,
                skus = ?merged.dropped,
                "Dropped segment edits for SKUs outside the planning scope"
            );
        }

        Ok(GatheredInputs {
            inputs: PlanningInputs::from_parts(sales, central, store_stock, merged.segments),
            dropped_edits: merged.dropped,
        })
    }
}

/// A computed plan.
#[derive(Debug, Clone)]
pub struct Plan {
    pub outcome: AllocationOutcome,
    pub summary: ReplenishmentSummary,
    pub dropped_edits: Vec<Sku>,
}

/// Gathers inputs and runs the allocator.
#[derive(Clone)]
pub struct ReplenishmentPlanner {
    aggregator: InputAggregator,
}

impl ReplenishmentPlanner {
    /// Create a planner.
    #[must_use]
    pub fn new(source: Arc<dyn PlanningDataSource>, policy: EditMergePolicy) -> Self {
        Self {
            aggregator: InputAggregator::new(source, policy),
        }
    }

    /// Compute a plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanningError` if the inputs cannot be gathered.
    #[tracing::instrument(skip_all, fields(window = %request.window.key(), stores = request.priority.len()))]
    pub async fn plan(&self, request: &PlanRequest) -> Result<Plan, PlanningError> {
        let gathered = self.aggregator.gather(request).await?;

        let outcome = allocate(&gathered.inputs, &request.priority);
        let summary =
            ReplenishmentSummary::from_lines(&outcome.replenishment_table, &outcome.break_data);

        tracing::info!(
            skus = gathered.inputs.store_stock().len(),
            lines = outcome.replenishment_table.len(),
            breaks = outcome.break_data.len(),
            stores_served = summary.stores_served(),
            total_replenishment = %summary.total_replenishment,
            total_break_qty = %summary.total_break_qty,
            "Replenishment planned"
        );

        Ok(Plan {
            outcome,
            summary,
            dropped_edits: gathered.dropped_edits,
        })
    }
}
