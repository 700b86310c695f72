//! Planning window: the inclusive date range sales are summed over.

use chrono::NaiveDate;
use serde::Serialize;

/// Errors that can occur when building a [`PlanningWindow`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// The end date precedes the start date.
    #[error("planning window end {end} is before start {start}")]
    Inverted {
        /// Requested start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
    },
}

/// Inclusive `[start, end]` date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl PlanningWindow {
    /// Create a window, rejecting `end < start`. A single-day window is valid.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Inverted`] if `end` is before `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if end < start {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self {
            start_date: start,
            end_date: end,
        })
    }

    /// First day of the window.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start_date
    }

    /// Last day of the window (inclusive).
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end_date
    }

    /// Stable key identifying the window, e.g. `2026-09-01..2026-09-30`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}..{}", self.start_date, self.end_date)
    }
}
