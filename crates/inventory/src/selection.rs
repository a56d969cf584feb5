//! FEFO/FIFO lot selection for stock consumption.
//!
//! Lots expiring sooner are consumed first ("first expired, first out"); lots
//! without an expiry date come after every dated lot. Ties fall back to the
//! received date ("first in, first out"), then to the lot id so the order is
//! total and stable across calls.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use bodega_core::{DomainError, DomainResult, LotId, ProductId, WarehouseId};

use crate::lot::StockLot;

/// Consumption priority between two lots.
pub fn consumption_order(a: &StockLot, b: &StockLot) -> Ordering {
    let by_expiry = match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_expiry
        .then_with(|| a.received_date.cmp(&b.received_date))
        .then_with(|| a.lot_id.cmp(&b.lot_id))
}

/// Select the lots of `product_id` in `warehouse_id` that still hold stock,
/// in consumption order.
///
/// An empty selection is a normal outcome ("no stock available"), not an error.
pub fn select_lots<I>(
    lots: I,
    product_id: ProductId,
    warehouse_id: WarehouseId,
    desired: Option<i64>,
) -> LotSelection
where
    I: IntoIterator<Item = StockLot>,
{
    let mut candidates: Vec<StockLot> = lots
        .into_iter()
        .filter(|l| l.product_id == product_id && l.warehouse_id == warehouse_id && l.has_stock())
        .collect();

    candidates.sort_by(consumption_order);

    LotSelection {
        product_id,
        warehouse_id,
        requested: desired,
        lots: candidates,
    }
}

/// Ordered candidate lots for one product in one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotSelection {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub requested: Option<i64>,
    pub lots: Vec<StockLot>,
}

/// Quantity to take from one lot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotDraw {
    pub lot_id: LotId,
    pub quantity: i64,
}

impl LotSelection {
    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    pub fn no_stock_available(&self) -> bool {
        self.is_empty()
    }

    /// Total quantity across the selected lots.
    pub fn available(&self) -> i64 {
        self.lots.iter().map(|l| l.current_quantity).sum()
    }

    /// Whether the requested quantity (if any) can be met from these lots.
    pub fn covers_request(&self) -> bool {
        match self.requested {
            Some(q) => self.available() >= q,
            None => !self.is_empty(),
        }
    }

    /// How much of the requested quantity the lots cannot cover.
    pub fn shortfall(&self) -> i64 {
        self.requested
            .map(|q| (q - self.available()).max(0))
            .unwrap_or(0)
    }

    /// Split `quantity` across the lots in consumption order.
    ///
    /// Nothing is reserved; the plan is only valid against the snapshot it was
    /// computed from.
    pub fn plan(&self, quantity: i64) -> DomainResult<Vec<LotDraw>> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let available = self.available();
        if available < quantity {
            return Err(DomainError::insufficient_stock(quantity, available));
        }

        let mut remaining = quantity;
        let mut draws = Vec::new();
        for lot in &self.lots {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(lot.current_quantity);
            draws.push(LotDraw {
                lot_id: lot.lot_id,
                quantity: take,
            });
            remaining -= take;
        }

        Ok(draws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(id: i64, expiry: Option<NaiveDate>, received: NaiveDate, qty: i64) -> StockLot {
        StockLot {
            lot_id: LotId::new(id),
            product_id: ProductId::new(1),
            warehouse_id: WarehouseId::new(1),
            current_quantity: qty,
            received_date: received,
            expiry_date: expiry,
            is_expired: false,
            unit_price: 100,
        }
    }

    fn ids(sel: &LotSelection) -> Vec<i64> {
        sel.lots.iter().map(|l| l.lot_id.get()).collect()
    }

    #[test]
    fn fefo_then_fifo_with_undated_last() {
        let a = lot(1, Some(date(2026, 1, 10)), date(2025, 1, 1), 5);
        let b = lot(2, Some(date(2026, 1, 10)), date(2025, 2, 1), 5);
        let c = lot(3, None, date(2024, 1, 1), 5);

        let sel = select_lots(vec![c, b, a], ProductId::new(1), WarehouseId::new(1), None);
        assert_eq!(ids(&sel), vec![1, 2, 3]);
    }

    #[test]
    fn filters_other_products_warehouses_and_empty_lots() {
        let mut other_product = lot(1, None, date(2025, 1, 1), 5);
        other_product.product_id = ProductId::new(2);
        let mut other_warehouse = lot(2, None, date(2025, 1, 1), 5);
        other_warehouse.warehouse_id = WarehouseId::new(2);
        let empty = lot(3, None, date(2025, 1, 1), 0);
        let keep = lot(4, None, date(2025, 1, 1), 1);

        let sel = select_lots(
            vec![other_product, other_warehouse, empty, keep],
            ProductId::new(1),
            WarehouseId::new(1),
            None,
        );
        assert_eq!(ids(&sel), vec![4]);
    }

    #[test]
    fn no_lots_is_reportable_not_an_error() {
        let sel = select_lots(Vec::new(), ProductId::new(1), WarehouseId::new(1), Some(3));
        assert!(sel.no_stock_available());
        assert_eq!(sel.available(), 0);
        assert!(!sel.covers_request());
        assert_eq!(sel.shortfall(), 3);
    }

    #[test]
    fn oversized_request_is_reported_not_trimmed() {
        let lots = vec![
            lot(1, Some(date(2026, 5, 1)), date(2025, 1, 1), 4),
            lot(2, None, date(2025, 1, 1), 2),
        ];
        let sel = select_lots(lots, ProductId::new(1), WarehouseId::new(1), Some(10));

        assert_eq!(sel.lots.len(), 2);
        assert_eq!(sel.available(), 6);
        assert!(!sel.covers_request());
        assert_eq!(sel.shortfall(), 4);
    }

    #[test]
    fn plan_draws_in_consumption_order() {
        let lots = vec![
            lot(1, None, date(2024, 1, 1), 10),
            lot(2, Some(date(2026, 5, 1)), date(2025, 1, 1), 4),
        ];
        let sel = select_lots(lots, ProductId::new(1), WarehouseId::new(1), Some(7));

        let plan = sel.plan(7).unwrap();
        assert_eq!(
            plan,
            vec![
                LotDraw { lot_id: LotId::new(2), quantity: 4 },
                LotDraw { lot_id: LotId::new(1), quantity: 3 },
            ]
        );
    }

    #[test]
    fn plan_refuses_what_it_cannot_cover() {
        let sel = select_lots(
            vec![lot(1, None, date(2024, 1, 1), 2)],
            ProductId::new(1),
            WarehouseId::new(1),
            None,
        );

        assert_eq!(
            sel.plan(3).unwrap_err(),
            DomainError::InsufficientStock { requested: 3, available: 2 }
        );
        assert!(matches!(sel.plan(0), Err(DomainError::Validation(_))));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_lot() -> impl Strategy<Value = StockLot> {
            (
                1i64..10_000,
                proptest::option::of(0i64..60),
                0i64..60,
                0i64..50,
            )
                .prop_map(|(id, expiry_offset, received_offset, qty)| {
                    let base = date(2025, 1, 1);
                    lot(
                        id,
                        expiry_offset.map(|d| base + chrono::Days::new(d as u64)),
                        base + chrono::Days::new(received_offset as u64),
                        qty,
                    )
                })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: output is FEFO (nulls last), FIFO within equal expiry.
            #[test]
            fn selection_is_fefo_then_fifo(lots in proptest::collection::vec(arb_lot(), 0..40)) {
                let sel = select_lots(lots, ProductId::new(1), WarehouseId::new(1), None);

                for pair in sel.lots.windows(2) {
                    let (a, b) = (&pair[0], &pair[1]);
                    match (a.expiry_date, b.expiry_date) {
                        (Some(x), Some(y)) => {
                            prop_assert!(x <= y);
                            if x == y {
                                prop_assert!(a.received_date <= b.received_date);
                            }
                        }
                        (Some(_), None) => {}
                        (None, Some(_)) => prop_assert!(false, "undated lot before dated lot"),
                        (None, None) => prop_assert!(a.received_date <= b.received_date),
                    }
                }
            }

            /// Property: only lots with stock are offered, and none is lost.
            #[test]
            fn selection_keeps_exactly_the_stocked_lots(
                lots in proptest::collection::vec(arb_lot(), 0..40),
            ) {
                let stocked = lots.iter().filter(|l| l.current_quantity > 0).count();
                let total: i64 = lots.iter().map(|l| l.current_quantity).sum();

                let sel = select_lots(lots, ProductId::new(1), WarehouseId::new(1), None);

                prop_assert_eq!(sel.lots.len(), stocked);
                prop_assert_eq!(sel.available(), total);
            }

            /// Property: a successful plan draws exactly the requested quantity
            /// and never more than a lot holds.
            #[test]
            fn plan_is_exact(
                lots in proptest::collection::vec(arb_lot(), 1..20),
                want in 1i64..200,
            ) {
                let lots: Vec<StockLot> = lots
                    .into_iter()
                    .enumerate()
                    .map(|(i, mut l)| {
                        l.lot_id = LotId::new(i as i64 + 1);
                        l
                    })
                    .collect();
                let sel = select_lots(lots, ProductId::new(1), WarehouseId::new(1), Some(want));
                match sel.plan(want) {
                    Ok(draws) => {
                        prop_assert_eq!(draws.iter().map(|d| d.quantity).sum::<i64>(), want);
                        for d in &draws {
                            let lot = sel.lots.iter().find(|l| l.lot_id == d.lot_id).unwrap();
                            prop_assert!(d.quantity > 0 && d.quantity <= lot.current_quantity);
                        }
                    }
                    Err(DomainError::InsufficientStock { available, .. }) => {
                        prop_assert!(available < want);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
            }
        }
    }
}
