//! Totals and breakdowns over allocator output.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::model::{BreakLine, ReplenishmentLine};
use crate::types::{Quantity, Sku, StoreCode};

/// Headline figures for a plan or a persisted replenishment record.
///
/// Order-insensitive: the same lines in any order give the same summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplenishmentSummary {
    pub total_replenishment: Quantity,
    pub total_sales: Quantity,
    pub total_ordered: Quantity,
    /// Stores that received stock, sorted by store code.
    pub replenishment_by_store: BTreeMap<StoreCode, Quantity>,
    pub total_break_qty: Quantity,
    pub break_by_store: BTreeMap<StoreCode, Quantity>,
    /// Store, then SKU drill-down of unmet demand.
    pub break_by_store_sku: BTreeMap<StoreCode, BTreeMap<Sku, Quantity>>,
}

impl ReplenishmentSummary {
    /// Reduce lines and break lines into a summary.
    #[must_use]
    pub fn from_lines(lines: &[ReplenishmentLine], breaks: &[BreakLine]) -> Self {
        let mut summary = Self::default();

        for line in lines {
            summary.total_replenishment += line.replenishment;
            summary.total_sales += line.sales;
            summary.total_ordered += line.ordered_qty;
            if line.replenishment.is_positive() {
                *summary
                    .replenishment_by_store
                    .entry(line.store.clone())
                    .or_default() += line.replenishment;
            }
        }

        for line in breaks {
            summary.total_break_qty += line.break_qty;
            *summary.break_by_store.entry(line.store.clone()).or_default() += line.break_qty;
            *summary
                .break_by_store_sku
                .entry(line.store.clone())
                .or_default()
                .entry(line.sku.clone())
                .or_default() += line.break_qty;
        }

        summary
    }

    /// Number of stores that received any stock.
    #[must_use]
    pub fn stores_served(&self) -> usize {
        self.replenishment_by_store.len()
    }
}

/// Grouping key for rolling up persisted lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Store,
    Sku,
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store => write!(f, "store"),
            Self::Sku => write!(f, "sku"),
        }
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "store" => Ok(Self::Store),
            "sku" => Ok(Self::Sku),
            _ => Err(format!("invalid grouping: {s}")),
        }
    }
}

/// Lines rolled up under one store or one SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineGroup {
    pub key: String,
    pub replenishment: Quantity,
    pub sales: Quantity,
    pub actual_stock: Quantity,
    pub ordered_qty: Quantity,
    pub line_count: usize,
}

/// Roll lines up by store or SKU, sorted by key.
#[must_use]
pub fn group_lines(lines: &[ReplenishmentLine], by: GroupBy) -> Vec<LineGroup> {
    let mut groups: BTreeMap<&str, LineGroup> = BTreeMap::new();

    for line in lines {
        let key = match by {
            GroupBy::Store => line.store.as_str(),
            GroupBy::Sku => line.sku.as_str(),
        };
        let group = groups.entry(key).or_insert_with(|| LineGroup {
            key: key.to_string(),
            replenishment: Quantity::ZERO,
            sales: Quantity::ZERO,
            actual_stock: Quantity::ZERO,
            ordered_qty: Quantity::ZERO,
            line_count: 0,
        });
        group.replenishment += line.replenishment;
        group.sales += line.sales;
        group.actual_stock += line.actual_stock;
        group.ordered_qty += line.ordered_qty;
        group.line_count += 1;
    }

    groups.into_values().collect()
}
