//! Database operations for the planning service.
//!
//! # Schema: `stock_planning`
//!
//! ## Source tables (loaded by the ERP/WMS sync)
//!
//! - `sales_line` - Invoiced sales lines per store
//! - `erp_inventory` - ERP stock per warehouse (central warehouse and stores)
//! - `wms_inventory` - WMS stock at the central warehouse
//! - `segment` / `segment_target` - Demand segmentation per SKU and store
//!
//! ## Replenishment records
//!
//! - `replenishment` - Committed plan headers
//! - `replenishment_line` - Planned allocations
//! - `replenishment_break` - Unmet demand
//! - `segmentation_history` - Segment targets a plan was computed with
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p stockplan-cli -- migrate
//! ```

pub mod planning;
pub mod replenishments;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use planning::PgPlanningSource;
pub use replenishments::PgReplenishmentStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, detail: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(detail.to_owned());
    }
    RepositoryError::Database(err)
}

/// `LIKE` pattern matching `query` anywhere, case-insensitively against
/// upper-cased columns. `%`, `_` and `\` in the query match literally.
pub(crate) fn contains_pattern(query: &str) -> String {
    let mut pattern = String::from("%");
    for c in query.trim().to_uppercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// [`contains_pattern`] for SKU columns, which are compared with dashes removed.
pub(crate) fn sku_pattern(query: &str) -> String {
    contains_pattern(&query.replace('-', ""))
}
