//! Greedy, priority-ordered allocation of central stock.
//!
//! For every SKU the stores listed in the [`StorePriority`] are visited in
//! order and each one takes as much of the SKU's remaining central stock as
//! its unmet need requires. The remaining stock is an explicit accumulator
//! threaded through a fold: earlier stores are served first and fully, later
//! stores get whatever is left, and nothing is ever redistributed.

use super::model::{
    AllocationOutcome, BreakLine, PlanningInputs, ReplenishmentLine, StorePriority, StoreStock,
    StoreStockStatus,
};
use crate::types::{Quantity, Sku, StoreCode};

/// The allocator's decision for one (SKU, store) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreDecision {
    pub segment: Quantity,
    pub sales: Quantity,
    pub actual_stock: Quantity,
    pub ordered_qty: Quantity,
    /// `max(segment, sales)`.
    pub demand: Quantity,
    /// Demand not covered by on-hand and in-transit stock, never negative.
    pub need: Quantity,
    /// Units granted from central stock.
    pub allocation: Quantity,
    /// Need central stock could not cover.
    pub shortfall: Quantity,
}

impl StoreDecision {
    /// Decide a store's allocation given the central stock still available.
    ///
    /// Returns `None` when the segment target is exactly zero: the store is
    /// not stocked with this SKU, whatever it sold.
    #[must_use]
    pub fn evaluate(
        segment: Quantity,
        sales: Quantity,
        stock: StoreStock,
        remaining: Quantity,
    ) -> Option<Self> {
        if segment.is_zero() {
            return None;
        }

        let demand = segment.max(sales);
        let need = (demand - stock.supply()).non_negative();
        let allocation = need.min(remaining.non_negative());

        Some(Self {
            segment,
            sales,
            actual_stock: stock.available,
            ordered_qty: stock.ordered,
            demand,
            need,
            allocation,
            shortfall: need - allocation,
        })
    }
}

/// Allocation state for one SKU after visiting some or all of its stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuAllocation {
    pub sku: Sku,
    /// Central stock before any store was served.
    pub initial: Quantity,
    /// Central stock left after the stores visited so far.
    pub remaining: Quantity,
    pub lines: Vec<ReplenishmentLine>,
    pub breaks: Vec<BreakLine>,
}

impl SkuAllocation {
    fn start(sku: Sku, central: Quantity) -> Self {
        Self {
            sku,
            initial: central,
            remaining: central,
            lines: Vec::new(),
            breaks: Vec::new(),
        }
    }

    fn serve(mut self, store: &StoreCode, stock: StoreStock, inputs: &PlanningInputs) -> Self {
        let segment = inputs.segment_target(&self.sku, store);
        let sales = inputs.sales(&self.sku, store);
        let Some(decision) = StoreDecision::evaluate(segment, sales, stock, self.remaining) else {
            return self;
        };

        if decision.allocation.is_positive() {
            let delivery = inputs
                .segment(&self.sku)
                .map(|s| s.delivery_label().to_string())
                .unwrap_or_default();
            self.lines.push(ReplenishmentLine {
                sku: self.sku.clone(),
                store: store.clone(),
                segment: decision.segment,
                sales: decision.sales,
                actual_stock: decision.actual_stock,
                ordered_qty: decision.ordered_qty,
                replenishment: decision.allocation,
                delivery,
            });
            self.remaining -= decision.allocation;
        }

        if decision.shortfall.is_positive() {
            self.breaks.push(BreakLine {
                sku: self.sku.clone(),
                store: store.clone(),
                break_qty: decision.shortfall,
            });
        }

        self
    }
}

/// Allocate one SKU's central stock across its stores.
///
/// Stores in `priority` without an entry in `status` are skipped.
#[must_use]
pub fn allocate_sku(
    inputs: &PlanningInputs,
    status: &StoreStockStatus,
    priority: &StorePriority,
) -> SkuAllocation {
    let start = SkuAllocation::start(status.sku.clone(), inputs.central_stock(&status.sku));

    priority
        .iter()
        .filter_map(|store| status.stores.get(store).map(|stock| (store, *stock)))
        .fold(start, |state, (store, stock)| state.serve(store, stock, inputs))
}

/// Allocate every SKU that has store stock, in store-stock order.
#[must_use]
pub fn allocate_by_sku(inputs: &PlanningInputs, priority: &StorePriority) -> Vec<SkuAllocation> {
    inputs
        .store_stock()
        .iter()
        .map(|status| allocate_sku(inputs, status, priority))
        .collect()
}

/// Run a full allocation and flatten it into the planning screen's shape.
#[must_use]
pub fn allocate(inputs: &PlanningInputs, priority: &StorePriority) -> AllocationOutcome {
    let mut outcome = AllocationOutcome {
        stock_segments: inputs.segments().to_vec(),
        ..AllocationOutcome::default()
    };

    for sku in allocate_by_sku(inputs, priority) {
        outcome.replenishment_table.extend(sku.lines);
        outcome.break_data.extend(sku.breaks);
    }

    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::replenishment::model::{CentralStock, SalesRecord, StoreDemandSegment};
    use rust_decimal::Decimal;

    fn q(n: i64) -> Quantity {
        Quantity::from(n)
    }

    fn empty_stock() -> StoreStock {
        StoreStock::new(0, 0)
    }

    fn allocated(sku: &SkuAllocation) -> Quantity {
        sku.lines.iter().map(|line| line.replenishment).sum()
    }

    fn single_store_inputs(
        central: i64,
        segment: i64,
        sales: i64,
        stock: StoreStock,
    ) -> PlanningInputs {
        PlanningInputs::from_parts(
            vec![SalesRecord::new("X").with_sales("A", sales)],
            vec![CentralStock::new("X", central)],
            vec![StoreStockStatus::new("X").with_store("A", stock)],
            vec![StoreDemandSegment::new("X", Some("D1".into())).with_target("A", segment)],
        )
    }

    #[test]
    fn test_end_to_end_two_stores() {
        let inputs = PlanningInputs::from_parts(
            vec![],
            vec![CentralStock::new("S1", 10)],
            vec![
                StoreStockStatus::new("S1")
                    .with_store("A", empty_stock())
                    .with_store("B", empty_stock()),
            ],
            vec![
                StoreDemandSegment::new("S1", None)
                    .with_target("A", 6)
                    .with_target("B", 6),
            ],
        );
        let priority = StorePriority::new(["A", "B"]);

        let allocations = allocate_by_sku(&inputs, &priority);
        assert_eq!(allocations.len(), 1);
        let s1 = &allocations[0];
        assert_eq!(s1.remaining, Quantity::ZERO);

        let grants: Vec<(&str, Quantity)> = s1
            .lines
            .iter()
            .map(|l| (l.store.as_str(), l.replenishment))
            .collect();
        assert_eq!(grants, [("A", q(6)), ("B", q(4))]);
        assert_eq!(s1.breaks.len(), 1);
        assert_eq!(s1.breaks[0].store.as_str(), "B");
        assert_eq!(s1.breaks[0].break_qty, q(2));
    }

    #[test]
    fn test_priority_order_decides_who_is_served() {
        let build = |order: [&str; 2]| {
            let inputs = PlanningInputs::from_parts(
                vec![],
                vec![CentralStock::new("S1", 5)],
                vec![
                    StoreStockStatus::new("S1")
                        .with_store("A", empty_stock())
                        .with_store("B", empty_stock()),
                ],
                vec![
                    StoreDemandSegment::new("S1", None)
                        .with_target("A", 5)
                        .with_target("B", 5),
                ],
            );
            allocate(&inputs, &StorePriority::new(order))
        };

        let a_first = build(["A", "B"]);
        assert_eq!(a_first.replenishment_table.len(), 1);
        assert_eq!(a_first.replenishment_table[0].store.as_str(), "A");
        assert_eq!(a_first.break_data[0].store.as_str(), "B");
        assert_eq!(a_first.break_data[0].break_qty, q(5));

        let b_first = build(["B", "A"]);
        assert_eq!(b_first.replenishment_table[0].store.as_str(), "B");
        assert_eq!(b_first.break_data[0].store.as_str(), "A");
    }

    #[test]
    fn test_zero_segment_skips_store_entirely() {
        let inputs = single_store_inputs(100, 0, 50, empty_stock());
        let outcome = allocate(&inputs, &StorePriority::new(["A"]));
        assert!(outcome.replenishment_table.is_empty());
        assert!(outcome.break_data.is_empty());
    }

    #[test]
    fn test_missing_segment_counts_as_zero() {
        let inputs = PlanningInputs::from_parts(
            vec![SalesRecord::new("X").with_sales("A", 9)],
            vec![CentralStock::new("X", 10)],
            vec![StoreStockStatus::new("X").with_store("A", empty_stock())],
            vec![],
        );
        let outcome = allocate(&inputs, &StorePriority::new(["A"]));
        assert!(outcome.replenishment_table.is_empty());
        assert!(outcome.break_data.is_empty());
    }

    #[test]
    fn test_demand_is_max_of_segment_and_sales() {
        let decision = StoreDecision::evaluate(q(5), q(8), empty_stock(), q(100)).unwrap();
        assert_eq!(decision.demand, q(8));
        assert_eq!(decision.allocation, q(8));

        let decision = StoreDecision::evaluate(q(8), q(5), empty_stock(), q(100)).unwrap();
        assert_eq!(decision.demand, q(8));
        assert_eq!(decision.allocation, q(8));
    }

    #[test]
    fn test_covered_demand_emits_nothing() {
        let inputs = single_store_inputs(100, 8, 3, StoreStock::new(5, 3));
        let outcome = allocate(&inputs, &StorePriority::new(["A"]));
        assert!(outcome.replenishment_table.is_empty());
        assert!(outcome.break_data.is_empty());

        let decision = StoreDecision::evaluate(q(8), q(3), StoreStock::new(9, 4), q(100)).unwrap();
        assert_eq!(decision.need, Quantity::ZERO);
        assert_eq!(decision.shortfall, Quantity::ZERO);
    }

    #[test]
    fn test_partial_allocation_records_shortfall() {
        let inputs = single_store_inputs(5, 8, 0, empty_stock());
        let allocations = allocate_by_sku(&inputs, &StorePriority::new(["A"]));
        let x = &allocations[0];

        assert_eq!(x.lines.len(), 1);
        assert_eq!(x.lines[0].replenishment, q(5));
        assert_eq!(x.lines[0].delivery, "D1");
        assert_eq!(x.breaks.len(), 1);
        assert_eq!(x.breaks[0].break_qty, q(3));
        assert_eq!(x.remaining, Quantity::ZERO);
    }

    #[test]
    fn test_no_central_stock_is_all_shortfall() {
        let inputs = PlanningInputs::from_parts(
            vec![],
            vec![],
            vec![StoreStockStatus::new("X").with_store("A", StoreStock::new(1, 1))],
            vec![StoreDemandSegment::new("X", None).with_target("A", 6)],
        );
        let outcome = allocate(&inputs, &StorePriority::new(["A"]));
        assert!(outcome.replenishment_table.is_empty());
        assert_eq!(outcome.break_data[0].break_qty, q(4));
    }

    #[test]
    fn test_store_without_stock_record_is_skipped() {
        let inputs = PlanningInputs::from_parts(
            vec![],
            vec![CentralStock::new("X", 20)],
            vec![StoreStockStatus::new("X").with_store("A", empty_stock())],
            vec![
                StoreDemandSegment::new("X", None)
                    .with_target("A", 2)
                    .with_target("B", 7),
            ],
        );
        let outcome = allocate(&inputs, &StorePriority::new(["B", "A"]));

        assert_eq!(outcome.replenishment_table.len(), 1);
        assert_eq!(outcome.replenishment_table[0].store.as_str(), "A");
        assert!(outcome.break_data.iter().all(|b| b.store.as_str() != "B"));
    }

    #[test]
    fn test_stores_outside_priority_are_ignored() {
        let inputs = single_store_inputs(10, 4, 0, empty_stock());
        let outcome = allocate(&inputs, &StorePriority::new(["Z"]));
        assert!(outcome.replenishment_table.is_empty());
        assert!(outcome.break_data.is_empty());
    }

    #[test]
    fn test_central_stock_is_conserved_per_sku() {
        let stores = ["A", "B", "C", "D"];
        let mut status = StoreStockStatus::new("S1");
        let mut segment = StoreDemandSegment::new("S1", None);
        let mut sales = SalesRecord::new("S1");
        for (i, store) in (1_i64..).zip(stores) {
            status = status.with_store(store, StoreStock::new(i % 2, 0));
            segment = segment.with_target(store, i * 3);
            sales = sales.with_sales(store, 10 - i);
        }
        let inputs = PlanningInputs::from_parts(
            vec![sales],
            vec![CentralStock::new("S1", 17)],
            vec![status],
            vec![segment],
        );

        let allocations = allocate_by_sku(&inputs, &StorePriority::new(stores));
        let s1 = &allocations[0];
        assert!(allocated(s1) <= s1.initial);
        assert_eq!(allocated(s1) + s1.remaining, s1.initial);
        assert!(s1.remaining >= Quantity::ZERO);
    }

    #[test]
    fn test_each_sku_spends_its_own_stock() {
        let inputs = PlanningInputs::from_parts(
            vec![],
            vec![CentralStock::new("S1", 3), CentralStock::new("S2", 10)],
            vec![
                StoreStockStatus::new("S1").with_store("A", empty_stock()),
                StoreStockStatus::new("S2").with_store("A", empty_stock()),
            ],
            vec![
                StoreDemandSegment::new("S1", None).with_target("A", 5),
                StoreDemandSegment::new("S2", None).with_target("A", 5),
            ],
        );
        let outcome = allocate(&inputs, &StorePriority::new(["A"]));

        let grants: Vec<(&str, Quantity)> = outcome
            .replenishment_table
            .iter()
            .map(|l| (l.sku.as_str(), l.replenishment))
            .collect();
        assert_eq!(grants, [("S1", q(3)), ("S2", q(5))]);
        assert_eq!(outcome.break_data.len(), 1);
        assert_eq!(outcome.stock_segments.len(), 2);
    }

    #[test]
    fn test_fractional_quantities_are_not_rounded() {
        let half = Quantity::new(Decimal::new(5, 1));
        let decision =
            StoreDecision::evaluate(q(2), Quantity::ZERO, StoreStock::new(half, 0), q(1)).unwrap();
        assert_eq!(decision.need, Quantity::new(Decimal::new(15, 1)));
        assert_eq!(decision.allocation, q(1));
        assert_eq!(decision.shortfall, half);
    }

    #[test]
    fn test_extreme_quantities_do_not_overflow() {
        let huge = Quantity::new(Decimal::MAX);
        let stock = StoreStock::new(-5, -5);

        let decision = StoreDecision::evaluate(huge, huge, stock, huge).unwrap();

        assert_eq!(decision.need, huge);
        assert_eq!(decision.allocation, huge);
        assert_eq!(decision.shortfall, Quantity::ZERO);
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let inputs = single_store_inputs(5, 8, 2, StoreStock::new(1, 1));
        let priority = StorePriority::new(["A"]);
        assert_eq!(allocate(&inputs, &priority), allocate(&inputs, &priority));
    }
}
