use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use bodega_core::{Entity, LotId, ProductId, WarehouseId};

/// A quantity of one product held in one warehouse, received together.
///
/// Lots are never deleted: they are drawn down to zero, adjusted, or relocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLot {
    pub lot_id: LotId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub current_quantity: i64,
    pub received_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub is_expired: bool,
    /// Price in smallest currency unit.
    pub unit_price: u64,
}

impl StockLot {
    pub fn has_stock(&self) -> bool {
        self.current_quantity > 0
    }

    /// Whether the lot's expiry date is strictly before `today`.
    ///
    /// Lots without an expiry date never expire.
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|d| d < today)
    }

    /// Quantity after applying `delta`, or `None` if it would go negative.
    pub fn quantity_after(&self, delta: i64) -> Option<i64> {
        self.current_quantity
            .checked_add(delta)
            .filter(|q| *q >= 0)
    }
}

impl Entity for StockLot {
    type Id = LotId;

    fn id(&self) -> LotId {
        self.lot_id
    }
}

/// Insertable lot (the store assigns `lot_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockLot {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub current_quantity: i64,
    pub received_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub unit_price: u64,
}

impl NewStockLot {
    pub fn into_lot(self, lot_id: LotId) -> StockLot {
        StockLot {
            lot_id,
            product_id: self.product_id,
            warehouse_id: self.warehouse_id,
            current_quantity: self.current_quantity,
            received_date: self.received_date,
            expiry_date: self.expiry_date,
            is_expired: false,
            unit_price: self.unit_price,
        }
    }
}
