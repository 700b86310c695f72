//! Replenishment record domain types.
//!
//! A replenishment record is the immutable snapshot of a plan someone chose
//! to commit: a header, the planned lines, the unmet demand and the segment
//! targets the plan was computed with.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stockplan_core::replenishment::{
    BreakLine, ReplenishmentLine, StoreDemandSegment, StorePriority,
};
use stockplan_core::types::{DeliveryOption, PlanningWindow, Quantity, ReplenishmentId, WindowError};
use thiserror::Error;

/// Header of a committed plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ReplenishmentRecord {
    pub id: ReplenishmentId,
    pub total_replenishment: Quantity,
    pub total_break_qty: Quantity,
    pub selected_deliveries: Vec<DeliveryOption>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Store priority the plan was computed with, comma separated.
    pub stores_considered: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One page of record headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
    pub records: Vec<ReplenishmentRecord>,
    pub total_count: i64,
}

/// Body of a commit request, as sent by the planning screen.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SaveReplenishmentRequest {
    /// Client generated ID; retries of the same commit reuse it.
    #[serde(default)]
    pub id: Option<ReplenishmentId>,
    pub total_replenishment: Quantity,
    #[serde(default)]
    pub total_break_qty: Quantity,
    #[serde(default)]
    pub selected_deliveries: Vec<DeliveryOption>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub stores_considered: Option<StorePriority>,
    pub replenishment_data: Vec<ReplenishmentLine>,
    #[serde(default)]
    pub break_data: Vec<BreakLine>,
    #[serde(default)]
    pub stock_segments: Vec<StoreDemandSegment>,
}

/// Reasons a record is refused before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error(transparent)]
    Window(#[from] WindowError),

    #[error("a replenishment record needs at least one line")]
    NoLines,

    #[error("{field} is {declared} but the lines add up to {computed}")]
    TotalMismatch {
        field: &'static str,
        declared: Quantity,
        computed: Quantity,
    },
}

/// A validated record, ready to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReplenishmentRecord {
    pub id: ReplenishmentId,
    pub window: PlanningWindow,
    pub selected_deliveries: Vec<DeliveryOption>,
    pub stores_considered: Option<StorePriority>,
    pub total_replenishment: Quantity,
    pub total_break_qty: Quantity,
    pub lines: Vec<ReplenishmentLine>,
    pub breaks: Vec<BreakLine>,
    pub segments: Vec<StoreDemandSegment>,
}

impl NewReplenishmentRecord {
    /// Validate a commit request.
    ///
    /// The declared totals must equal the sums over the supplied lines, so a
    /// stored header can never disagree with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RecordError` if the window is inverted, there are no lines,
    /// or a declared total does not match.
    pub fn validate(request: SaveReplenishmentRequest) -> Result<Self, RecordError> {
        let window = PlanningWindow::new(request.start_date, request.end_date)?;

        if request.replenishment_data.is_empty() {
            return Err(RecordError::NoLines);
        }

        let computed: Quantity = request
            .replenishment_data
            .iter()
            .map(|line| line.replenishment)
            .sum();
        if computed != request.total_replenishment {
            return Err(RecordError::TotalMismatch {
                field: "TOTAL_REPLENISHMENT",
                declared: request.total_replenishment,
                computed,
            });
        }

        // Clients that do not send break lines only declare the total.
        if !request.break_data.is_empty() {
            let computed: Quantity = request.break_data.iter().map(|b| b.break_qty).sum();
            if computed != request.total_break_qty {
                return Err(RecordError::TotalMismatch {
                    field: "TOTAL_BREAK_QTY",
                    declared: request.total_break_qty,
                    computed,
                });
            }
        }

        Ok(Self {
            id: request.id.unwrap_or_else(ReplenishmentId::generate),
            window,
            selected_deliveries: request.selected_deliveries,
            stores_considered: request.stores_considered.filter(|p| !p.is_empty()),
            total_replenishment: request.total_replenishment,
            total_break_qty: request.total_break_qty,
            lines: request.replenishment_data,
            breaks: request.break_data,
            segments: request.stock_segments,
        })
    }

    /// The header this record will be stored with.
    #[must_use]
    pub fn header(&self, created_at: DateTime<Utc>) -> ReplenishmentRecord {
        ReplenishmentRecord {
            id: self.id,
            total_replenishment: self.total_replenishment,
            total_break_qty: self.total_break_qty,
            selected_deliveries: self.selected_deliveries.clone(),
            start_date: self.window.start(),
            end_date: self.window.end(),
            stores_considered: self.stores_considered.as_ref().map(StorePriority::joined),
            created_at,
        }
    }
}

/// Result of committing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "id", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// The record was written.
    Created(ReplenishmentId),
    /// A record with this ID already existed; nothing was written.
    AlreadyExists(ReplenishmentId),
}

impl CommitOutcome {
    /// ID of the committed record.
    #[must_use]
    pub const fn id(&self) -> ReplenishmentId {
        match self {
            Self::Created(id) | Self::AlreadyExists(id) => *id,
        }
    }
}
