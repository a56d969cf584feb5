use std::sync::Arc;

use thiserror::Error;

use bodega_core::{AdjustmentId, LotId, MovementTypeId, ProductId, TransferId, UserId, WarehouseId};
use bodega_inventory::{
    AdjustmentApproved, AdjustmentDraft, AdjustmentRejected, AdjustmentStatus,
    InventoryAdjustment, MovementCategory, MovementType, NewStockLot, NewStockMovement, Product,
    StockLot, StockMovement, StockTransfer, TransferApproved, TransferDraft, TransferRejected,
    TransferStatus,
};

/// Inventory store operation error.
///
/// These are **infrastructure errors** (missing rows, guarded updates that
/// refused, backend failures) as opposed to domain errors (validation,
/// state-machine conflicts).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A guarded quantity update would have driven a lot negative.
    #[error("insufficient stock in lot {lot_id}: requested {requested}, available {available}")]
    InsufficientStock {
        lot_id: LotId,
        requested: i64,
        available: i64,
    },

    /// The lot a pending transfer draws from was relocated or flagged expired
    /// after the request was made.
    #[error("lot {lot_id} is no longer available in warehouse {expected}: {reason}")]
    LotUnavailable {
        lot_id: LotId,
        expected: WarehouseId,
        reason: String,
    },

    #[error("store backend failure: {0}")]
    Backend(String),

    /// A row could not be decoded into its domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn insufficient(lot: &StockLot, delta: i64) -> Self {
        Self::InsufficientStock {
            lot_id: lot.lot_id,
            requested: delta.saturating_neg(),
            available: lot.current_quantity,
        }
    }
}

/// Checks the source lot of a transfer approval against the request.
///
/// A product mismatch means the rows disagree (`Corrupt`). A lot that left
/// the origin warehouse or was flagged expired is `LotUnavailable`.
pub(crate) fn ensure_transfer_source(
    source: &StockLot,
    event: &TransferApproved,
) -> Result<(), StoreError> {
    if source.product_id != event.product_id {
        return Err(StoreError::Corrupt(format!(
            "transfer {} names product {} but lot {} holds product {}",
            event.transfer_id, event.product_id, source.lot_id, source.product_id
        )));
    }
    let reason = if source.warehouse_id != event.from_warehouse_id {
        format!("lot is now in warehouse {}", source.warehouse_id)
    } else if source.is_expired {
        "lot is flagged expired".to_string()
    } else {
        return Ok(());
    };
    Err(StoreError::LotUnavailable {
        lot_id: source.lot_id,
        expected: event.from_warehouse_id,
        reason,
    })
}

/// Lot listing filter. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LotFilter {
    pub product_id: Option<ProductId>,
    pub warehouse_id: Option<WarehouseId>,
}

impl LotFilter {
    pub fn for_product_in(product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            product_id: Some(product_id),
            warehouse_id: Some(warehouse_id),
        }
    }

    pub fn matches(&self, lot: &StockLot) -> bool {
        self.product_id.is_none_or(|p| p == lot.product_id)
            && self.warehouse_id.is_none_or(|w| w == lot.warehouse_id)
    }
}

/// Offset pagination. A missing `limit` returns everything after `offset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Apply this page to rows already in display order.
    pub fn slice<T>(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        let rows = rows.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }
}

/// History query over adjustments. Results are newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdjustmentQuery {
    pub status: Option<AdjustmentStatus>,
    pub page: Page,
}

impl AdjustmentQuery {
    pub fn pending() -> Self {
        Self {
            status: Some(AdjustmentStatus::Pending),
            page: Page::default(),
        }
    }
}

/// History query over transfers. Results are newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferQuery {
    pub status: Option<TransferStatus>,
    pub page: Page,
}

impl TransferQuery {
    pub fn pending() -> Self {
        Self {
            status: Some(TransferStatus::Pending),
            page: Page::default(),
        }
    }
}

/// Everything a store needs to commit an approved adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentApproval {
    pub event: AdjustmentApproved,
    /// AJUSTE movement type matching the sign of `event.delta`.
    pub movement_type_id: MovementTypeId,
}

/// Everything a store needs to commit an approved transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferApproval {
    pub event: TransferApproved,
    pub outbound_type_id: MovementTypeId,
    pub inbound_type_id: MovementTypeId,
}

/// A new lot together with the ENTRADA movement that brings its stock in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotReceipt {
    pub lot: NewStockLot,
    pub movement_type_id: MovementTypeId,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Typed repository over the inventory tables.
///
/// ## Atomicity
///
/// Every method that changes a lot's `current_quantity` also appends the
/// matching `StockMovement`, in the same atomic unit. Implementations validate
/// all preconditions (row existence, non-negative result, PENDING status)
/// before mutating anything, so a failed call leaves no partial state.
///
/// ## Conditional transitions
///
/// The `commit_*` methods transition a PENDING record and return `Ok(false)`
/// when the record is no longer PENDING (someone else decided it first).
/// Nothing is mutated in that case.
pub trait InventoryStore: Send + Sync {
    fn get_lot(&self, lot_id: LotId) -> Result<Option<StockLot>, StoreError>;

    fn list_lots(&self, filter: &LotFilter) -> Result<Vec<StockLot>, StoreError>;

    fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    fn get_movement_type(
        &self,
        type_id: MovementTypeId,
    ) -> Result<Option<MovementType>, StoreError>;

    /// First active movement type of `category` with the given sign.
    fn find_movement_type(
        &self,
        category: MovementCategory,
        is_positive: bool,
    ) -> Result<Option<MovementType>, StoreError>;

    /// Ledger entries, newest first, optionally for a single lot.
    fn list_movements(&self, lot_id: Option<LotId>) -> Result<Vec<StockMovement>, StoreError>;

    fn get_adjustment(
        &self,
        adjustment_id: AdjustmentId,
    ) -> Result<Option<InventoryAdjustment>, StoreError>;

    fn list_adjustments(
        &self,
        query: &AdjustmentQuery,
    ) -> Result<Vec<InventoryAdjustment>, StoreError>;

    fn get_transfer(&self, transfer_id: TransferId) -> Result<Option<StockTransfer>, StoreError>;

    fn list_transfers(&self, query: &TransferQuery) -> Result<Vec<StockTransfer>, StoreError>;

    /// Insert a PENDING adjustment and assign its id.
    fn insert_adjustment(&self, draft: AdjustmentDraft)
    -> Result<InventoryAdjustment, StoreError>;

    /// Insert a PENDING transfer and assign its id.
    fn insert_transfer(&self, draft: TransferDraft) -> Result<StockTransfer, StoreError>;

    /// Apply a signed movement to its lot and append it to the ledger.
    fn record_movement(
        &self,
        movement: NewStockMovement,
    ) -> Result<(StockLot, StockMovement), StoreError>;

    /// Create a lot and its ENTRADA ledger entry.
    fn receive_lot(&self, receipt: LotReceipt) -> Result<(StockLot, StockMovement), StoreError>;

    /// Move a lot to another warehouse without touching its quantity.
    fn relocate_lot(
        &self,
        lot_id: LotId,
        warehouse_id: WarehouseId,
        mark_expired: bool,
    ) -> Result<StockLot, StoreError>;

    fn commit_adjustment_approval(&self, approval: &AdjustmentApproval)
    -> Result<bool, StoreError>;

    fn commit_adjustment_rejection(
        &self,
        rejection: &AdjustmentRejected,
    ) -> Result<bool, StoreError>;

    fn commit_transfer_approval(&self, approval: &TransferApproval) -> Result<bool, StoreError>;

    fn commit_transfer_rejection(&self, rejection: &TransferRejected)
    -> Result<bool, StoreError>;
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn get_lot(&self, lot_id: LotId) -> Result<Option<StockLot>, StoreError> {
        (**self).get_lot(lot_id)
    }

    fn list_lots(&self, filter: &LotFilter) -> Result<Vec<StockLot>, StoreError> {
        (**self).list_lots(filter)
    }

    fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products()
    }

    fn get_movement_type(
        &self,
        type_id: MovementTypeId,
    ) -> Result<Option<MovementType>, StoreError> {
        (**self).get_movement_type(type_id)
    }

    fn find_movement_type(
        &self,
        category: MovementCategory,
        is_positive: bool,
    ) -> Result<Option<MovementType>, StoreError> {
        (**self).find_movement_type(category, is_positive)
    }

    fn list_movements(&self, lot_id: Option<LotId>) -> Result<Vec<StockMovement>, StoreError> {
        (**self).list_movements(lot_id)
    }

    fn get_adjustment(
        &self,
        adjustment_id: AdjustmentId,
    ) -> Result<Option<InventoryAdjustment>, StoreError> {
        (**self).get_adjustment(adjustment_id)
    }

    fn list_adjustments(
        &self,
        query: &AdjustmentQuery,
    ) -> Result<Vec<InventoryAdjustment>, StoreError> {
        (**self).list_adjustments(query)
    }

    fn get_transfer(&self, transfer_id: TransferId) -> Result<Option<StockTransfer>, StoreError> {
        (**self).get_transfer(transfer_id)
    }

    fn list_transfers(&self, query: &TransferQuery) -> Result<Vec<StockTransfer>, StoreError> {
        (**self).list_transfers(query)
    }

    fn insert_adjustment(
        &self,
        draft: AdjustmentDraft,
    ) -> Result<InventoryAdjustment, StoreError> {
        (**self).insert_adjustment(draft)
    }

    fn insert_transfer(&self, draft: TransferDraft) -> Result<StockTransfer, StoreError> {
        (**self).insert_transfer(draft)
    }

    fn record_movement(
        &self,
        movement: NewStockMovement,
    ) -> Result<(StockLot, StockMovement), StoreError> {
        (**self).record_movement(movement)
    }

    fn receive_lot(&self, receipt: LotReceipt) -> Result<(StockLot, StockMovement), StoreError> {
        (**self).receive_lot(receipt)
    }

    fn relocate_lot(
        &self,
        lot_id: LotId,
        warehouse_id: WarehouseId,
        mark_expired: bool,
    ) -> Result<StockLot, StoreError> {
        (**self).relocate_lot(lot_id, warehouse_id, mark_expired)
    }

    fn commit_adjustment_approval(
        &self,
        approval: &AdjustmentApproval,
    ) -> Result<bool, StoreError> {
        (**self).commit_adjustment_approval(approval)
    }

    fn commit_adjustment_rejection(
        &self,
        rejection: &AdjustmentRejected,
    ) -> Result<bool, StoreError> {
        (**self).commit_adjustment_rejection(rejection)
    }

    fn commit_transfer_approval(&self, approval: &TransferApproval) -> Result<bool, StoreError> {
        (**self).commit_transfer_approval(approval)
    }

    fn commit_transfer_rejection(
        &self,
        rejection: &TransferRejected,
    ) -> Result<bool, StoreError> {
        (**self).commit_transfer_rejection(rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_slices_after_offset() {
        let rows = vec![1, 2, 3, 4, 5];
        assert_eq!(Page::new(2, 1).slice(rows.clone()), vec![2, 3]);
        assert_eq!(Page::default().slice(rows.clone()), rows);
        assert!(Page::new(3, 10).slice(rows).is_empty());
    }

    #[test]
    fn empty_filter_matches_every_lot() {
        let lot = StockLot {
            lot_id: LotId::new(1),
            product_id: ProductId::new(7),
            warehouse_id: WarehouseId::new(2),
            current_quantity: 5,
            received_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            expiry_date: None,
            is_expired: false,
            unit_price: 0,
        };
        assert!(LotFilter::default().matches(&lot));
        assert!(LotFilter::for_product_in(ProductId::new(7), WarehouseId::new(2)).matches(&lot));
        assert!(!LotFilter::for_product_in(ProductId::new(7), WarehouseId::new(3)).matches(&lot));
    }

    #[test]
    fn transfer_source_must_still_sit_in_origin_warehouse() {
        let mut lot = StockLot {
            lot_id: LotId::new(3),
            product_id: ProductId::new(7),
            warehouse_id: WarehouseId::new(1),
            current_quantity: 20,
            received_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            expiry_date: None,
            is_expired: false,
            unit_price: 0,
        };
        let event = TransferApproved {
            transfer_id: TransferId::new(1),
            lot_id: lot.lot_id,
            product_id: lot.product_id,
            from_warehouse_id: WarehouseId::new(1),
            to_warehouse_id: WarehouseId::new(2),
            quantity: 8,
            approved_by: UserId::new(),
            notes: None,
            occurred_at: chrono::Utc::now(),
        };
        assert!(ensure_transfer_source(&lot, &event).is_ok());

        lot.is_expired = true;
        assert!(matches!(
            ensure_transfer_source(&lot, &event),
            Err(StoreError::LotUnavailable { .. })
        ));

        lot.is_expired = false;
        lot.warehouse_id = WarehouseId::new(2);
        assert!(matches!(
            ensure_transfer_source(&lot, &event),
            Err(StoreError::LotUnavailable { expected, .. }) if expected == WarehouseId::new(1)
        ));

        lot.product_id = ProductId::new(8);
        assert!(matches!(ensure_transfer_source(&lot, &event), Err(StoreError::Corrupt(_))));
    }
}
