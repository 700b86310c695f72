//! Business logic services for the planning service.
//!
//! # Services
//!
//! - `planning` - Input aggregation and the replenishment planner
//! - `records` - Storage seam for committed plans
//! - `snapshot` - In-memory planning data for offline runs

pub mod planning;
pub mod records;
pub mod snapshot;

pub use planning::{
    InputAggregator, Page, Plan, PlanRequest, PlanningDataSource, PlanningError,
    ReplenishmentPlanner,
};
pub use records::{ReplenishmentStore, clamp_paging};
pub use snapshot::{PlanningSnapshot, SnapshotSource};
