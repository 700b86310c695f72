//! Offline planning from a JSON snapshot.
//!
//! # Usage
//!
//! ```bash
//! stockplan plan --input snapshot.json --output plan.json
//! ```
//!
//! The input file holds the planning inputs alongside the request:
//!
//! ```json
//! {
//!   "startDate": "2026-09-01",
//!   "endDate": "2026-09-30",
//!   "storePriority": ["A", "B"],
//!   "sales": [...],
//!   "centralStock": [...],
//!   "storeStock": [...],
//!   "segments": [...]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use stockplan_admin::routes::api::replenishment::PlanResponse;
use stockplan_admin::services::{
    PlanRequest, PlanningError, PlanningSnapshot, ReplenishmentPlanner, SnapshotSource,
};
use stockplan_core::replenishment::{EditMergePolicy, StoreDemandSegment, StorePriority};
use stockplan_core::types::{DeliveryOption, PlanningWindow, WindowError};
use thiserror::Error;

/// Errors from an offline planning run.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid plan file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error("storePriority must list at least one store")]
    NoStores,

    #[error(transparent)]
    Planning(#[from] PlanningError),
}

/// A planning request together with the inputs to plan from.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFile {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub delivery_options: Vec<DeliveryOption>,
    #[serde(default)]
    pub edited_segments: Vec<StoreDemandSegment>,
    pub store_priority: StorePriority,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub edit_policy: EditMergePolicy,
    #[serde(flatten)]
    pub snapshot: PlanningSnapshot,
}

/// Plan from an already parsed file.
///
/// # Errors
///
/// Returns an error for an inverted window or an empty store priority.
pub async fn plan_file(file: PlanFile) -> Result<PlanResponse, PlanError> {
    let window = PlanningWindow::new(file.start_date, file.end_date)?;
    if file.store_priority.is_empty() {
        return Err(PlanError::NoStores);
    }

    let planner = ReplenishmentPlanner::new(
        Arc::new(SnapshotSource::new(file.snapshot)),
        file.edit_policy,
    );
    let plan = planner
        .plan(&PlanRequest {
            window,
            query: file.query,
            delivery_options: file.delivery_options,
            edited_segments: file.edited_segments,
            priority: file.store_priority,
        })
        .await?;

    Ok(PlanResponse {
        outcome: plan.outcome,
        summary: plan.summary,
        dropped_edits: plan.dropped_edits,
    })
}

/// Read `input`, plan, and write the result to `output` or stdout.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or planning fails.
pub async fn run(input: &Path, output: Option<&Path>) -> Result<(), PlanError> {
    let raw = tokio::fs::read_to_string(input).await?;
    let file: PlanFile = serde_json::from_str(&raw)?;

    let response = plan_file(file).await?;
    let json = serde_json::to_string_pretty(&response)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            tracing::info!(
                path = %path.display(),
                lines = response.outcome.replenishment_table.len(),
                "Plan written"
            );
        }
        None => {
            #[allow(clippy::print_stdout)]
            {
                println!("{json}");
            }
        }
    }
    Ok(())
}
