//! In-memory planning data, loaded from a JSON snapshot.
//!
//! Used for offline planning runs from the CLI and as a test double. A
//! snapshot is assumed to hold sales for the window it was exported for, so
//! the window is not applied again.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stockplan_core::replenishment::{
    CentralStock, SalesRecord, StoreDemandSegment, StoreStockStatus,
};
use stockplan_core::types::{DeliveryOption, PlanningWindow, Sku};
use tokio::sync::RwLock;

use super::planning::{Page, PlanningDataSource};
use crate::db::RepositoryError;

/// Planning inputs exported in one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningSnapshot {
    #[serde(default)]
    pub sales: Vec<SalesRecord>,
    #[serde(default)]
    pub central_stock: Vec<CentralStock>,
    #[serde(default)]
    pub store_stock: Vec<StoreStockStatus>,
    #[serde(default)]
    pub segments: Vec<StoreDemandSegment>,
}

/// [`PlanningDataSource`] over a [`PlanningSnapshot`].
#[derive(Debug, Default)]
pub struct SnapshotSource {
    snapshot: RwLock<PlanningSnapshot>,
}

impl SnapshotSource {
    /// Wrap a snapshot.
    #[must_use]
    pub fn new(snapshot: PlanningSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }
}

/// SKU filter matching the database source: dashes are ignored on both sides.
fn matches(sku: &Sku, query: &str) -> bool {
    let query = query.trim().replace('-', "").to_uppercase();
    query.is_empty() || sku.as_str().replace('-', "").to_uppercase().contains(&query)
}

fn select<T: Clone>(items: &[T], sku: impl Fn(&T) -> &Sku, query: &str, page: Page) -> Vec<T> {
    let mut selected: Vec<T> = items
        .iter()
        .filter(|item| matches(sku(item), query))
        .cloned()
        .collect();
    selected.sort_by(|a, b| sku(a).cmp(sku(b)));
    page.slice(selected)
}

fn count<T>(items: &[T], sku: impl Fn(&T) -> &Sku, query: &str) -> i64 {
    let matching = items.iter().filter(|item| matches(sku(item), query)).count();
    i64::try_from(matching).unwrap_or(i64::MAX)
}

fn in_delivery(segment: &StoreDemandSegment, deliveries: &[DeliveryOption]) -> bool {
    deliveries.is_empty()
        || segment
            .delivery
            .as_ref()
            .is_some_and(|delivery| deliveries.contains(delivery))
}

fn segments_in_scope(
    segments: &[StoreDemandSegment],
    deliveries: &[DeliveryOption],
) -> Vec<StoreDemandSegment> {
    segments
        .iter()
        .filter(|segment| in_delivery(segment, deliveries))
        .cloned()
        .collect()
}

#[async_trait]
impl PlanningDataSource for SnapshotSource {
    async fn fetch_sales(
        &self,
        query: &str,
        _window: &PlanningWindow,
        page: Page,
    ) -> Result<Vec<SalesRecord>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(select(&snapshot.sales, |r| &r.sku, query, page))
    }

    async fn fetch_central_stock(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Vec<CentralStock>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(select(&snapshot.central_stock, |r| &r.sku, query, page))
    }

    async fn fetch_store_stock(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Vec<StoreStockStatus>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(select(&snapshot.store_stock, |r| &r.sku, query, page))
    }

    async fn fetch_segments(
        &self,
        query: &str,
        deliveries: &[DeliveryOption],
        page: Page,
    ) -> Result<Vec<StoreDemandSegment>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        let in_scope = segments_in_scope(&snapshot.segments, deliveries);
        Ok(select(&in_scope, |s| &s.sku, query, page))
    }

    async fn fetch_delivery_options(&self) -> Result<Vec<DeliveryOption>, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        let options: BTreeSet<DeliveryOption> = snapshot
            .segments
            .iter()
            .filter_map(|segment| segment.delivery.clone())
            .collect();
        Ok(options.into_iter().collect())
    }

    async fn count_sales(
        &self,
        query: &str,
        _window: &PlanningWindow,
    ) -> Result<i64, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(count(&snapshot.sales, |r| &r.sku, query))
    }

    async fn count_central_stock(&self, query: &str) -> Result<i64, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(count(&snapshot.central_stock, |r| &r.sku, query))
    }

    async fn count_store_stock(&self, query: &str) -> Result<i64, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        Ok(count(&snapshot.store_stock, |r| &r.sku, query))
    }

    async fn count_segments(
        &self,
        query: &str,
        deliveries: &[DeliveryOption],
    ) -> Result<i64, RepositoryError> {
        let snapshot = self.snapshot.read().await;
        let in_scope = segments_in_scope(&snapshot.segments, deliveries);
        Ok(count(&in_scope, |s| &s.sku, query))
    }

    async fn replace_segments(
        &self,
        segments: &[StoreDemandSegment],
    ) -> Result<u64, RepositoryError> {
        let mut seen = HashSet::new();
        if let Some(duplicate) = segments.iter().find(|s| !seen.insert(&s.sku)) {
            return Err(RepositoryError::Conflict(format!(
                "segment {} appears more than once",
                duplicate.sku
            )));
        }

        self.snapshot.write().await.segments = segments.to_vec();
        Ok(u64::try_from(segments.len()).unwrap_or(u64::MAX))
    }
}
