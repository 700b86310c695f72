//! Planning inputs read from the `stock_planning` source tables.
//!
//! Source rows are long (one row per SKU and store); they are folded into
//! one record per SKU here. SKU codes are compared with dashes removed,
//! since the ERP and the WMS disagree on whether codes carry them.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use stockplan_core::replenishment::{
    CentralStock, SalesRecord, StoreDemandSegment, StoreStock, StoreStockStatus,
};
use stockplan_core::types::{DeliveryOption, PlanningWindow, Quantity, Sku, StoreCode};

use super::{RepositoryError, conflict_on_unique, contains_pattern, sku_pattern};
use crate::config::PlanningConfig;
use crate::services::planning::{Page, PlanningDataSource};

/// Inventory status that counts as allocatable at the central warehouse.
const AVAILABLE_STATUS: &str = "DISPONIBLE";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SalesRow {
    sku: String,
    store_code: String,
    qty: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct CentralStockRow {
    sku: String,
    stock_erp: Decimal,
    stock_wms: Decimal,
    min_stock: Decimal,
}

impl From<CentralStockRow> for CentralStock {
    fn from(row: CentralStockRow) -> Self {
        Self {
            sku: Sku::from(row.sku),
            erp: Quantity::from(row.stock_erp),
            wms: Quantity::from(row.stock_wms),
            min_stock: Quantity::from(row.min_stock),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StoreStockRow {
    sku: String,
    store_code: String,
    available: Decimal,
    ordered: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct SegmentRow {
    sku: String,
    delivery: Option<String>,
    store_code: Option<String>,
    target: Option<Decimal>,
}

/// Fold SKU-ordered rows into one record per SKU.
pub(super) fn fold_by_sku<R, T>(
    rows: Vec<R>,
    sku_of: impl Fn(&R) -> &str,
    start: impl Fn(&R) -> T,
    add: impl Fn(&mut T, R),
    record_sku: impl Fn(&T) -> &Sku,
) -> Vec<T> {
    let mut records: Vec<T> = Vec::new();
    for row in rows {
        let same = records
            .last()
            .is_some_and(|last| record_sku(last).as_str() == sku_of(&row));
        if !same {
            records.push(start(&row));
        }
        if let Some(last) = records.last_mut() {
            add(last, row);
        }
    }
    records
}

// =============================================================================
// Data Source
// =============================================================================

/// [`PlanningDataSource`] backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgPlanningSource {
    pool: PgPool,
    central_warehouse: StoreCode,
    sales_document_pattern: String,
}

impl PgPlanningSource {
    /// Create a source reading with the given planning settings.
    #[must_use]
    pub fn new(pool: PgPool, planning: &PlanningConfig) -> Self {
        Self {
            pool,
            central_warehouse: planning.central_warehouse.clone(),
            sales_document_pattern: format!("{}%", planning.sales_document_prefix),
        }
    }
}

#[async_trait]
impl PlanningDataSource for PgPlanningSource {
    async fn fetch_sales(
        &self,
        query: &str,
        window: &PlanningWindow,
        page: Page,
    ) -> Result<Vec<SalesRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, SalesRow>(
            r"
            WITH page AS (
                SELECT DISTINCT REPLACE(sku, '-', '') AS sku
                FROM stock_planning.sales_line
                WHERE invoice_date BETWEEN $1 AND $2
                  AND invoice_id LIKE $3
                  AND UPPER(REPLACE(sku, '-', '')) LIKE $4
                ORDER BY 1
                LIMIT $5 OFFSET $6
            )
            SELECT p.sku, s.store_code, SUM(s.qty) AS qty
            FROM stock_planning.sales_line s
            JOIN page p ON p.sku = REPLACE(s.sku, '-', '')
            WHERE s.invoice_date BETWEEN $1 AND $2
              AND s.invoice_id LIKE $3
            GROUP BY p.sku, s.store_code
            ORDER BY p.sku, s.store_code
            ",
        )
        .bind(window.start())
        .bind(window.end())
        .bind(&self.sales_document_pattern)
        .bind(sku_pattern(query))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_by_sku(
            rows,
            |row| row.sku.as_str(),
            |row| SalesRecord::new(row.sku.as_str()),
            |record, row| {
                *record
                    .by_store
                    .entry(StoreCode::from(row.store_code))
                    .or_default() += Quantity::from(row.qty);
            },
            |record| &record.sku,
        ))
    }

    async fn fetch_central_stock(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Vec<CentralStock>, RepositoryError> {
        let rows = sqlx::query_as::<_, CentralStockRow>(
            r"
            WITH erp AS (
                SELECT REPLACE(sku, '-', '') AS sku, SUM(available_on_hand) AS stock_erp
                FROM stock_planning.erp_inventory
                WHERE warehouse_id = $1
                  AND UPPER(status_id) = $2
                  AND UPPER(REPLACE(sku, '-', '')) LIKE $3
                GROUP BY 1
            ),
            wms AS (
                SELECT REPLACE(item_code, '-', '') AS sku,
                       SUM(qty_stock - qty_pending_picking) AS stock_wms
                FROM stock_planning.wms_inventory
                GROUP BY 1
            )
            SELECT erp.sku,
                   erp.stock_erp,
                   COALESCE(wms.stock_wms, 0) AS stock_wms,
                   LEAST(erp.stock_erp, COALESCE(wms.stock_wms, 0)) AS min_stock
            FROM erp
            LEFT JOIN wms ON wms.sku = erp.sku
            ORDER BY erp.sku
            LIMIT $4 OFFSET $5
            ",
        )
        .bind(self.central_warehouse.as_str())
        .bind(AVAILABLE_STATUS)
        .bind(sku_pattern(query))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CentralStock::from).collect())
    }

    async fn fetch_store_stock(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Vec<StoreStockStatus>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreStockRow>(
            r"
            WITH page AS (
                SELECT DISTINCT REPLACE(sku, '-', '') AS sku
                FROM stock_planning.erp_inventory
                WHERE warehouse_id <> $1
                  AND UPPER(REPLACE(sku, '-', '')) LIKE $2
                ORDER BY 1
                LIMIT $3 OFFSET $4
            )
            SELECT p.sku,
                   e.warehouse_id AS store_code,
                   SUM(e.available_on_hand) AS available,
                   SUM(e.ordered_qty) AS ordered
            FROM stock_planning.erp_inventory e
            JOIN page p ON p.sku = REPLACE(e.sku, '-', '')
            WHERE e.warehouse_id <> $1
            GROUP BY p.sku, e.warehouse_id
            ORDER BY p.sku, e.warehouse_id
            ",
        )
        .bind(self.central_warehouse.as_str())
        .bind(sku_pattern(query))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_by_sku(
            rows,
            |row| row.sku.as_str(),
            |row| StoreStockStatus::new(row.sku.as_str()),
            |status, row| {
                let entry = status
                    .stores
                    .entry(StoreCode::from(row.store_code))
                    .or_default();
                *entry = StoreStock::new(
                    entry.available + Quantity::from(row.available),
                    entry.ordered + Quantity::from(row.ordered),
                );
            },
            |status| &status.sku,
        ))
    }

    async fn fetch_segments(
        &self,
        query: &str,
        deliveries: &[DeliveryOption],
        page: Page,
    ) -> Result<Vec<StoreDemandSegment>, RepositoryError> {
        let deliveries: Vec<String> = deliveries.iter().map(ToString::to_string).collect();

        let rows = sqlx::query_as::<_, SegmentRow>(
            r"
            WITH page AS (
                SELECT sku
                FROM stock_planning.segment
                WHERE (UPPER(REPLACE(sku, '-', '')) LIKE $1 OR UPPER(COALESCE(delivery, '')) LIKE $2)
                  AND (cardinality($3::text[]) = 0 OR delivery = ANY($3))
                ORDER BY sku
                LIMIT $4 OFFSET $5
            )
            SELECT s.sku, s.delivery, t.store_code, t.target
            FROM stock_planning.segment s
            JOIN page p ON p.sku = s.sku
            LEFT JOIN stock_planning.segment_target t ON t.sku = s.sku
            ORDER BY s.sku, t.store_code
            ",
        )
        .bind(sku_pattern(query))
        .bind(contains_pattern(query))
        .bind(&deliveries)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_by_sku(
            rows,
            |row| row.sku.as_str(),
            |row| {
                StoreDemandSegment::new(
                    row.sku.as_str(),
                    row.delivery.clone().map(DeliveryOption::from),
                )
            },
            |segment, row| {
                if let (Some(store), Some(target)) = (row.store_code, row.target) {
                    segment.targets.insert(StoreCode::from(store), Quantity::from(target));
                }
            },
            |segment| &segment.sku,
        ))
    }

    async fn fetch_delivery_options(&self) -> Result<Vec<DeliveryOption>, RepositoryError> {
        let options = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT delivery
            FROM stock_planning.segment
            WHERE delivery IS NOT NULL
            ORDER BY delivery
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(options.into_iter().map(DeliveryOption::from).collect())
    }

    async fn count_sales(
        &self,
        query: &str,
        window: &PlanningWindow,
    ) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(DISTINCT REPLACE(sku, '-', ''))
            FROM stock_planning.sales_line
            WHERE invoice_date BETWEEN $1 AND $2
              AND invoice_id LIKE $3
              AND UPPER(REPLACE(sku, '-', '')) LIKE $4
            ",
        )
        .bind(window.start())
        .bind(window.end())
        .bind(&self.sales_document_pattern)
        .bind(sku_pattern(query))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_central_stock(&self, query: &str) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(DISTINCT REPLACE(sku, '-', ''))
            FROM stock_planning.erp_inventory
            WHERE warehouse_id = $1
              AND UPPER(status_id) = $2
              AND UPPER(REPLACE(sku, '-', '')) LIKE $3
            ",
        )
        .bind(self.central_warehouse.as_str())
        .bind(AVAILABLE_STATUS)
        .bind(sku_pattern(query))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_store_stock(&self, query: &str) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(DISTINCT REPLACE(sku, '-', ''))
            FROM stock_planning.erp_inventory
            WHERE warehouse_id <> $1
              AND UPPER(REPLACE(sku, '-', '')) LIKE $2
            ",
        )
        .bind(self.central_warehouse.as_str())
        .bind(sku_pattern(query))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_segments(
        &self,
        query: &str,
        deliveries: &[DeliveryOption],
    ) -> Result<i64, RepositoryError> {
        let deliveries: Vec<String> = deliveries.iter().map(ToString::to_string).collect();

        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*)
            FROM stock_planning.segment
            WHERE (UPPER(REPLACE(sku, '-', '')) LIKE $1 OR UPPER(COALESCE(delivery, '')) LIKE $2)
              AND (cardinality($3::text[]) = 0 OR delivery = ANY($3))
            ",
        )
        .bind(sku_pattern(query))
        .bind(contains_pattern(query))
        .bind(&deliveries)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn replace_segments(
        &self,
        segments: &[StoreDemandSegment],
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Targets cascade
        sqlx::query("DELETE FROM stock_planning.segment")
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            r"
            INSERT INTO stock_planning.segment (sku, delivery)
            SELECT * FROM UNNEST($1::text[], $2::text[])
            ",
        )
        .bind(segments.iter().map(|s| s.sku.to_string()).collect::<Vec<_>>())
        .bind(
            segments
                .iter()
                .map(|s| s.delivery.as_ref().map(ToString::to_string))
                .collect::<Vec<_>>(),
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "segment SKUs must be unique"))?
        .rows_affected();

        let mut skus = Vec::new();
        let mut stores = Vec::new();
        let mut targets = Vec::new();
        for segment in segments {
            for (store, target) in &segment.targets {
                skus.push(segment.sku.to_string());
                stores.push(store.to_string());
                targets.push(target.as_decimal());
            }
        }

        sqlx::query(
            r"
            INSERT INTO stock_planning.segment_target (sku, store_code, target)
            SELECT * FROM UNNEST($1::text[], $2::text[], $3::numeric[])
            ",
        )
        .bind(skus)
        .bind(stores)
        .bind(targets)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(segments = inserted, "Segmentation replaced");
        Ok(inserted)
    }
}
