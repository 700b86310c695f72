//! Store replenishment planning.
//!
//! Given per-SKU sales, central (distribution center) stock, per-store stock
//! and a demand segmentation, the engine greedily spends each SKU's central
//! stock on stores in a caller-supplied priority order.
//!
//! ```text
//! fetched segments ─┐
//! edited segments ──┴─ merge ─┐
//! sales, central stock, ──────┴─ PlanningInputs ─ allocate ─ AllocationOutcome ─ summary
//! store stock
//! ```
//!
//! # Modules
//!
//! - [`model`] - Input and output records
//! - [`merge`] - Applying client edits to fetched segments
//! - [`allocate`] - The greedy, priority-ordered allocator
//! - [`summary`] - Totals and breakdowns over allocator output

pub mod allocate;
pub mod merge;
pub mod model;
pub mod summary;

pub use allocate::{SkuAllocation, StoreDecision, allocate, allocate_by_sku};
pub use merge::{EditMergePolicy, SegmentMerge, merge_edited_segments};
pub use model::{
    AllocationOutcome, BreakLine, CentralStock, PlanningInputs, ReplenishmentLine, SalesRecord,
    StoreDemandSegment, StorePriority, StoreStock, StoreStockStatus,
};
pub use summary::{GroupBy, LineGroup, ReplenishmentSummary, group_lines};
