//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::PlanningConfig;
use crate::db::{PgPlanningSource, PgReplenishmentStore};
use crate::services::{PlanningDataSource, ReplenishmentPlanner, ReplenishmentStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    planning: PlanningConfig,
    source: Arc<dyn PlanningDataSource>,
    store: Arc<dyn ReplenishmentStore>,
    planner: ReplenishmentPlanner,
}

impl AppState {
    /// Build state from explicit collaborators.
    #[must_use]
    pub fn new(
        planning: PlanningConfig,
        source: Arc<dyn PlanningDataSource>,
        store: Arc<dyn ReplenishmentStore>,
    ) -> Self {
        let planner = ReplenishmentPlanner::new(Arc::clone(&source), planning.edit_policy);
        Self {
            inner: Arc::new(AppStateInner {
                planning,
                source,
                store,
                planner,
            }),
        }
    }

    /// Build state backed by `PostgreSQL`.
    #[must_use]
    pub fn with_pool(planning: PlanningConfig, pool: PgPool) -> Self {
        let source = Arc::new(PgPlanningSource::new(pool.clone(), &planning));
        let store = Arc::new(PgReplenishmentStore::new(pool));
        Self::new(planning, source, store)
    }

    /// Planning settings.
    #[must_use]
    pub fn planning(&self) -> &PlanningConfig {
        &self.inner.planning
    }

    /// Planning data source.
    #[must_use]
    pub fn source(&self) -> &dyn PlanningDataSource {
        self.inner.source.as_ref()
    }

    /// Replenishment record storage.
    #[must_use]
    pub fn store(&self) -> &dyn ReplenishmentStore {
        self.inner.store.as_ref()
    }

    /// Planner over the configured data source.
    #[must_use]
    pub fn planner(&self) -> &ReplenishmentPlanner {
        &self.inner.planner
    }
}
