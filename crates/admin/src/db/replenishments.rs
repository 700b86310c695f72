//! Replenishment record repository.
//!
//! A commit writes the header, lines, break lines and segmentation history
//! in one transaction. The transaction first takes an advisory lock keyed
//! on the planning window, so commits for the same window run one at a time;
//! the header insert is `ON CONFLICT DO NOTHING`, so a retried commit is a
//! no-op.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use stockplan_core::replenishment::{
    BreakLine, ReplenishmentLine, StoreDemandSegment, StorePriority,
};
use stockplan_core::types::{DeliveryOption, Quantity, ReplenishmentId, Sku, StoreCode};
use uuid::Uuid;

use super::planning::fold_by_sku;
use super::{RepositoryError, contains_pattern};
use crate::models::replenishment::{
    CommitOutcome, NewReplenishmentRecord, RecordPage, ReplenishmentRecord,
};
use crate::services::records::ReplenishmentStore;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    total_replenishment: Decimal,
    total_break_qty: Decimal,
    selected_deliveries: Vec<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    stores_considered: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<RecordRow> for ReplenishmentRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            id: ReplenishmentId::new(row.id),
            total_replenishment: Quantity::from(row.total_replenishment),
            total_break_qty: Quantity::from(row.total_break_qty),
            selected_deliveries: row
                .selected_deliveries
                .into_iter()
                .map(DeliveryOption::from)
                .collect(),
            start_date: row.start_date,
            end_date: row.end_date,
            stores_considered: row.stores_considered,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    sku: String,
    store_code: String,
    segment: Decimal,
    sales: Decimal,
    actual_stock: Decimal,
    ordered_qty: Decimal,
    replenishment: Decimal,
    delivery: String,
}

impl From<LineRow> for ReplenishmentLine {
    fn from(row: LineRow) -> Self {
        Self {
            sku: Sku::from(row.sku),
            store: StoreCode::from(row.store_code),
            segment: Quantity::from(row.segment),
            sales: Quantity::from(row.sales),
            actual_stock: Quantity::from(row.actual_stock),
            ordered_qty: Quantity::from(row.ordered_qty),
            replenishment: Quantity::from(row.replenishment),
            delivery: row.delivery,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BreakRow {
    sku: String,
    store_code: String,
    break_qty: Decimal,
}

impl From<BreakRow> for BreakLine {
    fn from(row: BreakRow) -> Self {
        Self {
            sku: Sku::from(row.sku),
            store: StoreCode::from(row.store_code),
            break_qty: Quantity::from(row.break_qty),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    sku: String,
    delivery: Option<String>,
    store_code: String,
    target: Decimal,
}

const RECORD_COLUMNS: &str = "id, total_replenishment, total_break_qty, selected_deliveries, \
                              start_date, end_date, stores_considered, created_at";

// =============================================================================
// Repository
// =============================================================================

/// [`ReplenishmentStore`] backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgReplenishmentStore {
    pool: PgPool,
}

impl PgReplenishmentStore {
    /// Create a new replenishment record repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_lines(
        tx: &mut Transaction<'_, Postgres>,
        record: &NewReplenishmentRecord,
    ) -> Result<(), RepositoryError> {
        let lines = &record.lines;
        sqlx::query(
            r"
            INSERT INTO stock_planning.replenishment_line (
                replenishment_id, sku, store_code, segment, sales,
                actual_stock, ordered_qty, replenishment, delivery
            )
            SELECT $1, * FROM UNNEST(
                $2::text[], $3::text[], $4::numeric[], $5::numeric[],
                $6::numeric[], $7::numeric[], $8::numeric[], $9::text[]
            )
            ",
        )
        .bind(record.id.as_uuid())
        .bind(lines.iter().map(|l| l.sku.to_string()).collect::<Vec<_>>())
        .bind(lines.iter().map(|l| l.store.to_string()).collect::<Vec<_>>())
        .bind(decimals(lines, |l| l.segment))
        .bind(decimals(lines, |l| l.sales))
        .bind(decimals(lines, |l| l.actual_stock))
        .bind(decimals(lines, |l| l.ordered_qty))
        .bind(decimals(lines, |l| l.replenishment))
        .bind(lines.iter().map(|l| l.delivery.clone()).collect::<Vec<_>>())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn insert_breaks(
        tx: &mut Transaction<'_, Postgres>,
        record: &NewReplenishmentRecord,
    ) -> Result<(), RepositoryError> {
        if record.breaks.is_empty() {
            return Ok(());
        }

        let breaks = &record.breaks;
        sqlx::query(
            r"
            INSERT INTO stock_planning.replenishment_break (replenishment_id, sku, store_code, break_qty)
            SELECT $1, * FROM UNNEST($2::text[], $3::text[], $4::numeric[])
            ",
        )
        .bind(record.id.as_uuid())
        .bind(breaks.iter().map(|b| b.sku.to_string()).collect::<Vec<_>>())
        .bind(breaks.iter().map(|b| b.store.to_string()).collect::<Vec<_>>())
        .bind(decimals(breaks, |b| b.break_qty))
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn insert_segmentation_history(
        tx: &mut Transaction<'_, Postgres>,
        record: &NewReplenishmentRecord,
    ) -> Result<(), RepositoryError> {
        let mut skus = Vec::new();
        let mut deliveries = Vec::new();
        let mut stores = Vec::new();
        let mut targets = Vec::new();
        for segment in &record.segments {
            for (store, target) in &segment.targets {
                skus.push(segment.sku.to_string());
                deliveries.push(segment.delivery.as_ref().map(ToString::to_string));
                stores.push(store.to_string());
                targets.push(target.as_decimal());
            }
        }
        if skus.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r"
            INSERT INTO stock_planning.segmentation_history (
                replenishment_id, sku, delivery, store_code, target
            )
            SELECT $1, * FROM UNNEST($2::text[], $3::text[], $4::text[], $5::numeric[])
            ",
        )
        .bind(record.id.as_uuid())
        .bind(skus)
        .bind(deliveries)
        .bind(stores)
        .bind(targets)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

fn decimals<T>(items: &[T], field: impl Fn(&T) -> Quantity) -> Vec<Decimal> {
    items.iter().map(|item| field(item).as_decimal()).collect()
}

#[async_trait]
impl ReplenishmentStore for PgReplenishmentStore {
    async fn save(&self, record: &NewReplenishmentRecord) -> Result<CommitOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Released when the transaction ends
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(record.window.key())
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            r"
            INSERT INTO stock_planning.replenishment (
                id, total_replenishment, total_break_qty, selected_deliveries,
                start_date, end_date, stores_considered
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(record.id.as_uuid())
        .bind(record.total_replenishment.as_decimal())
        .bind(record.total_break_qty.as_decimal())
        .bind(
            record
                .selected_deliveries
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
        )
        .bind(record.window.start())
        .bind(record.window.end())
        .bind(record.stores_considered.as_ref().map(StorePriority::joined))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            tracing::info!(id = %record.id, "Replenishment record already committed");
            return Ok(CommitOutcome::AlreadyExists(record.id));
        }

        Self::insert_lines(&mut tx, record).await?;
        Self::insert_breaks(&mut tx, record).await?;
        Self::insert_segmentation_history(&mut tx, record).await?;

        tx.commit().await?;

        tracing::info!(
            id = %record.id,
            window = %record.window.key(),
            lines = record.lines.len(),
            breaks = record.breaks.len(),
            "Replenishment record committed"
        );
        Ok(CommitOutcome::Created(record.id))
    }

    async fn list(&self, query: &str, page: u32, limit: u32) -> Result<RecordPage, RepositoryError> {
        let pattern = contains_pattern(query);
        let offset = i64::from(page.max(1) - 1) * i64::from(limit);

        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            r"
            SELECT {RECORD_COLUMNS}
            FROM stock_planning.replenishment
            WHERE UPPER(id::text) LIKE $1
               OR UPPER(array_to_string(selected_deliveries, ',')) LIKE $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(&pattern)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total_count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*)
            FROM stock_planning.replenishment
            WHERE UPPER(id::text) LIKE $1
               OR UPPER(array_to_string(selected_deliveries, ',')) LIKE $1
            ",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok(RecordPage {
            records: rows.into_iter().map(Into::into).collect(),
            total_count,
        })
    }

    async fn get(&self, id: ReplenishmentId) -> Result<ReplenishmentRecord, RepositoryError> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM stock_planning.replenishment WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn lines(&self, id: ReplenishmentId) -> Result<Vec<ReplenishmentLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, LineRow>(
            r"
            SELECT sku, store_code, segment, sales, actual_stock, ordered_qty,
                   replenishment, delivery
            FROM stock_planning.replenishment_line
            WHERE replenishment_id = $1
            ORDER BY sku, store_code
            ",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn breaks(&self, id: ReplenishmentId) -> Result<Vec<BreakLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, BreakRow>(
            r"
            SELECT sku, store_code, break_qty
            FROM stock_planning.replenishment_break
            WHERE replenishment_id = $1
            ORDER BY sku, store_code
            ",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn segmentation(
        &self,
        id: ReplenishmentId,
    ) -> Result<Vec<StoreDemandSegment>, RepositoryError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r"
            SELECT sku, delivery, store_code, target
            FROM stock_planning.segmentation_history
            WHERE replenishment_id = $1
            ORDER BY sku, store_code
            ",
        )
        .bind(id.as_uuid())
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
                segment
                    .targets
                    .insert(StoreCode::from(row.store_code), Quantity::from(row.target));
            },
            |segment| &segment.sku,
        ))
    }

    async fn delete(&self, id: ReplenishmentId) -> Result<(), RepositoryError> {
        // Lines, break lines and history cascade
        let deleted = sqlx::query("DELETE FROM stock_planning.replenishment WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::info!(id = %id, "Replenishment record deleted");
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
