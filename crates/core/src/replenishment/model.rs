//! Replenishment input and output records.
//!
//! Records that clients edit or inspect keep the flat, upper-case wire shape
//! the planning screens use (`{"SKU": "...", "LASCONDES": 4, ...}`). Store
//! stock is the exception: it is always nested per store, so there is no
//! `STORE_AVAILABLE`-style key building anywhere.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{DeliveryOption, Quantity, Sku, StoreCode};

/// Target stocking level ("segmentation") of one SKU across stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDemandSegment {
    #[serde(rename = "SKU")]
    pub sku: Sku,
    /// Delivery / fulfillment channel label the SKU is planned under.
    #[serde(rename = "DELIVERY", default)]
    pub delivery: Option<DeliveryOption>,
    /// Target per store. Stores without an entry have a target of zero.
    #[serde(flatten)]
    pub targets: BTreeMap<StoreCode, Quantity>,
}

impl StoreDemandSegment {
    /// Create a segment with no store targets.
    #[must_use]
    pub fn new(sku: impl Into<Sku>, delivery: Option<DeliveryOption>) -> Self {
        Self {
            sku: sku.into(),
            delivery,
            targets: BTreeMap::new(),
        }
    }

    /// Builder-style helper to set a store target.
    #[must_use]
    pub fn with_target(mut self, store: impl Into<StoreCode>, target: impl Into<Quantity>) -> Self {
        self.targets.insert(store.into(), target.into());
        self
    }

    /// Target for a store; missing reads as zero.
    #[must_use]
    pub fn target(&self, store: &StoreCode) -> Quantity {
        self.targets.get(store).copied().unwrap_or_default()
    }

    /// Delivery label for output lines; empty when the segment has none.
    #[must_use]
    pub fn delivery_label(&self) -> &str {
        self.delivery.as_ref().map_or("", DeliveryOption::as_str)
    }
}

/// Units sold per store for one SKU over the planning window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    #[serde(rename = "SKU")]
    pub sku: Sku,
    #[serde(flatten)]
    pub by_store: BTreeMap<StoreCode, Quantity>,
}

impl SalesRecord {
    /// Create a record with no sales.
    #[must_use]
    pub fn new(sku: impl Into<Sku>) -> Self {
        Self {
            sku: sku.into(),
            by_store: BTreeMap::new(),
        }
    }

    /// Builder-style helper to set a store's sales.
    #[must_use]
    pub fn with_sales(mut self, store: impl Into<StoreCode>, units: impl Into<Quantity>) -> Self {
        self.by_store.insert(store.into(), units.into());
        self
    }
}

/// Stock of one SKU at the central distribution node.
///
/// The ERP and the WMS can disagree; the usable figure is the smaller one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentralStock {
    #[serde(rename = "SKU")]
    pub sku: Sku,
    #[serde(rename = "STOCKERP", default)]
    pub erp: Quantity,
    #[serde(rename = "STOCKWMS", default)]
    pub wms: Quantity,
    #[serde(rename = "MINSTOCK", default)]
    pub min_stock: Quantity,
}

impl CentralStock {
    /// Central stock where ERP and WMS agree on `units`.
    #[must_use]
    pub fn new(sku: impl Into<Sku>, units: impl Into<Quantity>) -> Self {
        let units = units.into();
        Self {
            sku: sku.into(),
            erp: units,
            wms: units,
            min_stock: units,
        }
    }

    /// Units available for allocation, never negative.
    #[must_use]
    pub fn available(&self) -> Quantity {
        self.min_stock.non_negative()
    }
}

/// On-hand and in-transit stock at one store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StoreStock {
    #[serde(default)]
    pub available: Quantity,
    #[serde(default)]
    pub ordered: Quantity,
}

impl StoreStock {
    /// Create a stock entry.
    #[must_use]
    pub fn new(available: impl Into<Quantity>, ordered: impl Into<Quantity>) -> Self {
        Self {
            available: available.into(),
            ordered: ordered.into(),
        }
    }

    /// Supply that already covers demand: on hand plus in transit.
    #[must_use]
    pub fn supply(&self) -> Quantity {
        self.available + self.ordered
    }
}

/// Stock status of one SKU across stores.
///
/// A store only takes part in planning for this SKU if it has an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StoreStockStatus {
    pub sku: Sku,
    #[serde(default)]
    pub stores: BTreeMap<StoreCode, StoreStock>,
}

impl StoreStockStatus {
    /// Create a status with no stores.
    #[must_use]
    pub fn new(sku: impl Into<Sku>) -> Self {
        Self {
            sku: sku.into(),
            stores: BTreeMap::new(),
        }
    }

    /// Builder-style helper to add a store entry.
    #[must_use]
    pub fn with_store(mut self, store: impl Into<StoreCode>, stock: StoreStock) -> Self {
        self.stores.insert(store.into(), stock);
        self
    }
}

/// Order in which stores are served when they compete for central stock.
///
/// Repeated stores keep their first position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StoreCode>", into = "Vec<StoreCode>")]
pub struct StorePriority(Vec<StoreCode>);

impl StorePriority {
    /// Build a priority list, dropping repeats.
    pub fn new<I, S>(stores: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StoreCode>,
    {
        let mut ordered: Vec<StoreCode> = Vec::new();
        for store in stores {
            let store = store.into();
            if !ordered.contains(&store) {
                ordered.push(store);
            }
        }
        Self(ordered)
    }

    /// Stores in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &StoreCode> {
        self.0.iter()
    }

    /// Number of stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no store is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma separated list, as stored on replenishment records.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(StoreCode::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<Vec<StoreCode>> for StorePriority {
    fn from(stores: Vec<StoreCode>) -> Self {
        Self::new(stores)
    }
}

impl From<StorePriority> for Vec<StoreCode> {
    fn from(priority: StorePriority) -> Self {
        priority.0
    }
}

/// One store's planned replenishment of one SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ReplenishmentLine {
    pub sku: Sku,
    pub store: StoreCode,
    pub segment: Quantity,
    pub sales: Quantity,
    pub actual_stock: Quantity,
    pub ordered_qty: Quantity,
    pub replenishment: Quantity,
    #[serde(default)]
    pub delivery: String,
}

/// Demand that central stock could not cover ("quiebre").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct BreakLine {
    pub sku: Sku,
    pub store: StoreCode,
    pub break_qty: Quantity,
}

/// Everything the allocator reads, keyed for sparse lookups.
///
/// Lookups never fail: a SKU or store without data reads as zero. Duplicate
/// records for a SKU are combined when the inputs are built (quantities are
/// summed, store stock entries are summed per store, the last segment wins),
/// so every SKU is planned exactly once against a single central stock figure.
#[derive(Debug, Clone, Default)]
pub struct PlanningInputs {
    sales: HashMap<Sku, SalesRecord>,
    central: HashMap<Sku, Quantity>,
    store_stock: Vec<StoreStockStatus>,
    segments: Vec<StoreDemandSegment>,
    segment_index: HashMap<Sku, usize>,
}

impl PlanningInputs {
    /// Build lookup maps from the fetched slices.
    #[must_use]
    pub fn from_parts(
        sales: Vec<SalesRecord>,
        central: Vec<CentralStock>,
        store_stock: Vec<StoreStockStatus>,
        segments: Vec<StoreDemandSegment>,
    ) -> Self {
        let mut sales_by_sku: HashMap<Sku, SalesRecord> = HashMap::new();
        for record in sales {
            match sales_by_sku.get_mut(&record.sku) {
                Some(existing) => {
                    for (store, units) in record.by_store {
                        *existing.by_store.entry(store).or_default() += units;
                    }
                }
                None => {
                    sales_by_sku.insert(record.sku.clone(), record);
                }
            }
        }

        let mut central_by_sku: HashMap<Sku, Quantity> = HashMap::new();
        for stock in central {
            *central_by_sku.entry(stock.sku.clone()).or_default() += stock.available();
        }

        let mut merged_stock: Vec<StoreStockStatus> = Vec::with_capacity(store_stock.len());
        let mut stock_index: HashMap<Sku, usize> = HashMap::new();
        for status in store_stock {
            if let Some(existing) = stock_index
                .get(&status.sku)
                .and_then(|&i| merged_stock.get_mut(i))
            {
                for (store, stock) in status.stores {
                    let entry = existing.stores.entry(store).or_default();
                    entry.available += stock.available;
                    entry.ordered += stock.ordered;
                }
            } else {
                stock_index.insert(status.sku.clone(), merged_stock.len());
                merged_stock.push(status);
            }
        }

        let mut merged_segments: Vec<StoreDemandSegment> = Vec::with_capacity(segments.len());
        let mut segment_index: HashMap<Sku, usize> = HashMap::new();
        for segment in segments {
            if let Some(slot) = segment_index
                .get(&segment.sku)
                .and_then(|&i| merged_segments.get_mut(i))
            {
                *slot = segment;
            } else {
                segment_index.insert(segment.sku.clone(), merged_segments.len());
                merged_segments.push(segment);
            }
        }

        Self {
            sales: sales_by_sku,
            central: central_by_sku,
            store_stock: merged_stock,
            segments: merged_segments,
            segment_index,
        }
    }

    /// Central stock available for a SKU. Missing SKU reads as zero.
    #[must_use]
    pub fn central_stock(&self, sku: &Sku) -> Quantity {
        self.central.get(sku).copied().unwrap_or_default()
    }

    /// Units a store sold of a SKU. Missing SKU or store reads as zero.
    #[must_use]
    pub fn sales(&self, sku: &Sku, store: &StoreCode) -> Quantity {
        self.sales
            .get(sku)
            .and_then(|record| record.by_store.get(store))
            .copied()
            .unwrap_or_default()
    }

    /// Segment record for a SKU, if any.
    #[must_use]
    pub fn segment(&self, sku: &Sku) -> Option<&StoreDemandSegment> {
        self.segment_index
            .get(sku)
            .and_then(|&i| self.segments.get(i))
    }

    /// Segment target for a store. Missing SKU or store reads as zero.
    #[must_use]
    pub fn segment_target(&self, sku: &Sku, store: &StoreCode) -> Quantity {
        self.segment(sku)
            .map(|segment| segment.target(store))
            .unwrap_or_default()
    }

    /// Store stock records in the order they were fetched.
    #[must_use]
    pub fn store_stock(&self) -> &[StoreStockStatus] {
        &self.store_stock
    }

    /// Segments in the order they were fetched.
    #[must_use]
    pub fn segments(&self) -> &[StoreDemandSegment] {
        &self.segments
    }
}

/// Result of one planning run, in the shape the planning screen consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationOutcome {
    pub replenishment_table: Vec<ReplenishmentLine>,
    pub break_data: Vec<BreakLine>,
    pub stock_segments: Vec<StoreDemandSegment>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_segment_wire_shape_is_flat() {
        let segment: StoreDemandSegment = serde_json::from_value(json!({
            "SKU": "A",
            "DELIVERY": "D1",
            "STORE1": 20,
            "STORE2": "3"
        }))
        .unwrap();

        assert_eq!(segment.sku, Sku::from("A"));
        assert_eq!(segment.delivery_label(), "D1");
        assert_eq!(segment.target(&StoreCode::from("STORE1")), Quantity::from(20));
        assert_eq!(segment.target(&StoreCode::from("STORE2")), Quantity::from(3));
        assert_eq!(segment.target(&StoreCode::from("NOPE")), Quantity::ZERO);

        let back = serde_json::to_value(&segment).unwrap();
        assert_eq!(back["STORE1"], json!(20));
        assert_eq!(back["DELIVERY"], json!("D1"));
    }

    #[test]
    fn test_segment_without_delivery_has_empty_label() {
        let segment: StoreDemandSegment =
            serde_json::from_value(json!({"SKU": "A", "STORE1": 1})).unwrap();
        assert_eq!(segment.delivery_label(), "");
    }

    #[test]
    fn test_store_priority_drops_repeats() {
        let priority = StorePriority::new(["A", "B", "A", "C"]);
        let stores: Vec<&str> = priority.iter().map(StoreCode::as_str).collect();
        assert_eq!(stores, ["A", "B", "C"]);
        assert_eq!(priority.joined(), "A,B,C");
    }

    #[test]
    fn test_store_priority_deserializes_from_list() {
        let priority: StorePriority = serde_json::from_value(json!(["X", "Y", "X"])).unwrap();
        assert_eq!(priority.len(), 2);
    }

    #[test]
    fn test_lookups_default_to_zero() {
        let inputs = PlanningInputs::default();
        let sku = Sku::from("S1");
        let store = StoreCode::from("A");
        assert_eq!(inputs.central_stock(&sku), Quantity::ZERO);
        assert_eq!(inputs.sales(&sku, &store), Quantity::ZERO);
        assert_eq!(inputs.segment_target(&sku, &store), Quantity::ZERO);
        assert!(inputs.segment(&sku).is_none());
    }

    #[test]
    fn test_negative_central_stock_reads_as_zero() {
        let mut stock = CentralStock::new("S1", 10);
        stock.min_stock = Quantity::from(-4);
        let inputs = PlanningInputs::from_parts(vec![], vec![stock], vec![], vec![]);
        assert_eq!(inputs.central_stock(&Sku::from("S1")), Quantity::ZERO);
    }

    #[test]
    fn test_duplicate_store_stock_records_are_combined() {
        let inputs = PlanningInputs::from_parts(
            vec![],
            vec![],
            vec![
                StoreStockStatus::new("S1").with_store("A", StoreStock::new(1, 0)),
                StoreStockStatus::new("S2").with_store("A", StoreStock::new(5, 0)),
                StoreStockStatus::new("S1")
                    .with_store("A", StoreStock::new(2, 1))
                    .with_store("B", StoreStock::new(0, 0)),
            ],
            vec![],
        );

        let stock = inputs.store_stock();
        assert_eq!(stock.len(), 2);
        assert_eq!(stock[0].sku, Sku::from("S1"));
        assert_eq!(
            stock[0].stores[&StoreCode::from("A")],
            StoreStock::new(3, 1)
        );
        assert!(stock[0].stores.contains_key(&StoreCode::from("B")));
    }

    #[test]
    fn test_outcome_wire_keys() {
        let outcome = AllocationOutcome {
            replenishment_table: vec![ReplenishmentLine {
                sku: Sku::from("S1"),
                store: StoreCode::from("A"),
                segment: Quantity::from(6),
                sales: Quantity::ZERO,
                actual_stock: Quantity::ZERO,
                ordered_qty: Quantity::ZERO,
                replenishment: Quantity::from(6),
                delivery: String::new(),
            }],
            break_data: vec![BreakLine {
                sku: Sku::from("S1"),
                store: StoreCode::from("B"),
                break_qty: Quantity::from(2),
            }],
            stock_segments: vec![],
        };

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["replenishmentTable"][0]["REPLENISHMENT"], json!(6));
        assert_eq!(value["replenishmentTable"][0]["ACTUAL_STOCK"], json!(0));
        assert_eq!(value["breakData"][0]["BREAK_QTY"], json!(2));
        assert!(value["stockSegments"].as_array().unwrap().is_empty());
    }
}
