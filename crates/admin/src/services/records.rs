//! Persistence seam for replenishment records.

use async_trait::async_trait;
use stockplan_core::replenishment::{BreakLine, ReplenishmentLine, StoreDemandSegment};
use stockplan_core::types::ReplenishmentId;

use crate::db::RepositoryError;
use crate::models::replenishment::{
    CommitOutcome, NewReplenishmentRecord, RecordPage, ReplenishmentRecord,
};

/// Storage for committed plans.
///
/// Commits are idempotent by record ID: committing an ID that already exists
/// writes nothing and reports [`CommitOutcome::AlreadyExists`].
#[async_trait]
pub trait ReplenishmentStore: Send + Sync {
    /// Write header, lines, break lines and segment history atomically.
    async fn save(&self, record: &NewReplenishmentRecord) -> Result<CommitOutcome, RepositoryError>;

    /// Headers matching `query` on ID or delivery, newest first.
    ///
    /// `page` is one-based.
    async fn list(&self, query: &str, page: u32, limit: u32) -> Result<RecordPage, RepositoryError>;

    /// One header; `RepositoryError::NotFound` if missing.
    async fn get(&self, id: ReplenishmentId) -> Result<ReplenishmentRecord, RepositoryError>;

    /// Planned lines of a record, ordered by SKU then store.
    async fn lines(&self, id: ReplenishmentId) -> Result<Vec<ReplenishmentLine>, RepositoryError>;

    /// Break lines of a record, ordered by SKU then store.
    async fn breaks(&self, id: ReplenishmentId) -> Result<Vec<BreakLine>, RepositoryError>;

    /// Segment targets a record was planned with, ordered by SKU.
    async fn segmentation(
        &self,
        id: ReplenishmentId,
    ) -> Result<Vec<StoreDemandSegment>, RepositoryError>;

    /// Delete a record and everything attached to it; `RepositoryError::NotFound` if missing.
    async fn delete(&self, id: ReplenishmentId) -> Result<(), RepositoryError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Clamp list paging to sane values: page >= 1, 1 <= limit <= 100.
#[must_use]
pub fn clamp_paging(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.filter(|p| *p > 0).unwrap_or(1);
    let limit = limit.filter(|l| *l > 0).unwrap_or(10).min(100);
    (page, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_paging() {
        assert_eq!(clamp_paging(None, None), (1, 10));
        assert_eq!(clamp_paging(Some(0), Some(0)), (1, 10));
        assert_eq!(clamp_paging(Some(3), Some(500)), (3, 100));
    }
}
