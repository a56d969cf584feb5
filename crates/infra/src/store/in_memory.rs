use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bodega_core::{
    AdjustmentId, Aggregate, Entity, LotId, MovementId, MovementTypeId, TransferId, WarehouseId,
};
use bodega_inventory::{
    AdjustmentDraft, AdjustmentEvent, AdjustmentRejected, AdjustmentStatus, InventoryAdjustment,
    MovementCategory, MovementCause, MovementType, NewStockLot, NewStockMovement, Product,
    StockLot, StockMovement, StockTransfer, TransferDraft, TransferEvent, TransferRejected,
    TransferStatus,
};

use super::r#trait::{
    AdjustmentApproval, AdjustmentQuery, InventoryStore, LotFilter, LotReceipt, StoreError,
    TransferApproval, TransferQuery, ensure_transfer_source,
};

/// Monotonic id counters, one per table.
#[derive(Debug, Default)]
struct Sequences {
    lot: i64,
    movement: i64,
    adjustment: i64,
    transfer: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<bodega_core::ProductId, Product>,
    movement_types: BTreeMap<MovementTypeId, MovementType>,
    lots: BTreeMap<LotId, StockLot>,
    movements: BTreeMap<MovementId, StockMovement>,
    adjustments: BTreeMap<AdjustmentId, InventoryAdjustment>,
    transfers: BTreeMap<TransferId, StockTransfer>,
    seq: Sequences,
}

fn upsert<E: Entity>(table: &mut BTreeMap<E::Id, E>, row: E) {
    table.insert(row.id(), row);
}

impl Tables {
    fn lot(&self, lot_id: LotId) -> Result<&StockLot, StoreError> {
        self.lots
            .get(&lot_id)
            .ok_or_else(|| StoreError::not_found("lot", lot_id))
    }

    fn movement_type(&self, type_id: MovementTypeId) -> Result<&MovementType, StoreError> {
        self.movement_types
            .get(&type_id)
            .ok_or_else(|| StoreError::not_found("movement type", type_id))
    }

    /// Checked new quantity for `lot_id` after `delta`.
    fn quantity_after(&self, lot_id: LotId, delta: i64) -> Result<i64, StoreError> {
        let lot = self.lot(lot_id)?;
        lot.quantity_after(delta)
            .ok_or_else(|| StoreError::insufficient(lot, delta))
    }

    /// Set a lot's quantity and append the paired ledger entry.
    ///
    /// Callers must have validated `quantity` via `quantity_after` first.
    fn post(&mut self, quantity: i64, movement: NewStockMovement) -> StockMovement {
        if let Some(lot) = self.lots.get_mut(&movement.lot_id) {
            lot.current_quantity = quantity;
        }
        let movement_id = MovementId::new(next(&mut self.seq.movement));
        let stored = movement.into_movement(movement_id);
        upsert(&mut self.movements, stored.clone());
        stored
    }

    fn insert_lot(&mut self, lot: NewStockLot) -> StockLot {
        let lot_id = LotId::new(next(&mut self.seq.lot));
        let stored = lot.into_lot(lot_id);
        upsert(&mut self.lots, stored.clone());
        stored
    }

    /// Destination lot for a transfer: same product, same expiry, target warehouse.
    fn transfer_destination(&self, source: &StockLot, to: WarehouseId) -> Option<LotId> {
        self.lots
            .values()
            .find(|lot| {
                lot.lot_id != source.lot_id
                    && lot.product_id == source.product_id
                    && lot.warehouse_id == to
                    && lot.expiry_date == source.expiry_date
            })
            .map(|lot| lot.lot_id)
    }
}

/// In-memory inventory store.
///
/// Intended for tests/dev. Every write takes the single write lock for its
/// whole duration, validates first and only then mutates, so commits are
/// atomic with respect to each other.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with one active movement type per category and sign.
    pub fn with_standard_movement_types() -> Self {
        let mut tables = Tables::default();
        for movement_type in standard_movement_types() {
            upsert(&mut tables.movement_types, movement_type);
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    pub fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        upsert(&mut self.write()?.products, product);
        Ok(())
    }

    pub fn upsert_movement_type(&self, movement_type: MovementType) -> Result<(), StoreError> {
        upsert(&mut self.write()?.movement_types, movement_type);
        Ok(())
    }

    /// Insert a lot as opening stock, without a ledger entry.
    ///
    /// Fixture loading only; production intake goes through `receive_lot`.
    pub fn seed_lot(&self, lot: NewStockLot) -> Result<StockLot, StoreError> {
        Ok(self.write()?.insert_lot(lot))
    }
}

/// Movement types of a fresh installation: ids 1..=6.
pub fn standard_movement_types() -> Vec<MovementType> {
    [
        (1, "Entrada por donación", MovementCategory::Entry, true),
        (2, "Salida por consumo", MovementCategory::Exit, false),
        (3, "Traspaso salida", MovementCategory::Transfer, false),
        (4, "Traspaso entrada", MovementCategory::Transfer, true),
        (5, "Ajuste positivo", MovementCategory::Adjustment, true),
        (6, "Ajuste negativo", MovementCategory::Adjustment, false),
    ]
    .into_iter()
    .map(|(id, name, category, is_positive)| MovementType {
        type_id: MovementTypeId::new(id),
        type_name: name.to_string(),
        category,
        is_positive,
        is_active: true,
    })
    .collect()
}

impl InventoryStore for InMemoryInventoryStore {
    fn get_lot(&self, lot_id: LotId) -> Result<Option<StockLot>, StoreError> {
        Ok(self.read()?.lots.get(&lot_id).cloned())
    }

    fn list_lots(&self, filter: &LotFilter) -> Result<Vec<StockLot>, StoreError> {
        Ok(self
            .read()?
            .lots
            .values()
            .filter(|lot| filter.matches(lot))
            .cloned()
            .collect())
    }

    fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    fn get_movement_type(
        &self,
        type_id: MovementTypeId,
    ) -> Result<Option<MovementType>, StoreError> {
        Ok(self.read()?.movement_types.get(&type_id).cloned())
    }

    fn find_movement_type(
        &self,
        category: MovementCategory,
        is_positive: bool,
    ) -> Result<Option<MovementType>, StoreError> {
        Ok(self
            .read()?
            .movement_types
            .values()
            .find(|t| t.is_active && t.category == category && t.is_positive == is_positive)
            .cloned())
    }

    fn list_movements(&self, lot_id: Option<LotId>) -> Result<Vec<StockMovement>, StoreError> {
        let tables = self.read()?;
        let mut rows: Vec<StockMovement> = tables
            .movements
            .values()
            .filter(|m| lot_id.is_none_or(|id| id == m.lot_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.movement_id.cmp(&a.movement_id))
        });
        Ok(rows)
    }

    fn get_adjustment(
        &self,
        adjustment_id: AdjustmentId,
    ) -> Result<Option<InventoryAdjustment>, StoreError> {
        Ok(self.read()?.adjustments.get(&adjustment_id).cloned())
    }

    fn list_adjustments(
        &self,
        query: &AdjustmentQuery,
    ) -> Result<Vec<InventoryAdjustment>, StoreError> {
        let tables = self.read()?;
        let mut rows: Vec<&InventoryAdjustment> = tables
            .adjustments
            .values()
            .filter(|a| query.status.is_none_or(|s| s == a.status))
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.adjustment_id.cmp(&a.adjustment_id))
        });
        Ok(query.page.slice(rows.into_iter().cloned()))
    }

    fn get_transfer(&self, transfer_id: TransferId) -> Result<Option<StockTransfer>, StoreError> {
        Ok(self.read()?.transfers.get(&transfer_id).cloned())
    }

    fn list_transfers(&self, query: &TransferQuery) -> Result<Vec<StockTransfer>, StoreError> {
        let tables = self.read()?;
        let mut rows: Vec<&StockTransfer> = tables
            .transfers
            .values()
            .filter(|t| query.status.is_none_or(|s| s == t.status))
            .collect();
        rows.sort_by(|a, b| {
            b.requested_at
                .cmp(&a.requested_at)
                .then(b.transfer_id.cmp(&a.transfer_id))
        });
        Ok(query.page.slice(rows.into_iter().cloned()))
    }

    fn insert_adjustment(
        &self,
        draft: AdjustmentDraft,
    ) -> Result<InventoryAdjustment, StoreError> {
        let mut tables = self.write()?;
        tables.lot(draft.lot_id)?;

        let adjustment_id = AdjustmentId::new(next(&mut tables.seq.adjustment));
        let stored = draft.into_adjustment(adjustment_id);
        upsert(&mut tables.adjustments, stored.clone());
        Ok(stored)
    }

    fn insert_transfer(&self, draft: TransferDraft) -> Result<StockTransfer, StoreError> {
        let mut tables = self.write()?;
        tables.lot(draft.lot_id)?;

        let transfer_id = TransferId::new(next(&mut tables.seq.transfer));
        let stored = draft.into_transfer(transfer_id);
        upsert(&mut tables.transfers, stored.clone());
        Ok(stored)
    }

    fn record_movement(
        &self,
        movement: NewStockMovement,
    ) -> Result<(StockLot, StockMovement), StoreError> {
        let mut tables = self.write()?;
        tables.movement_type(movement.movement_type_id)?;
        let quantity = tables.quantity_after(movement.lot_id, movement.quantity)?;

        let lot_id = movement.lot_id;
        let stored = tables.post(quantity, movement);
        let lot = tables.lot(lot_id)?.clone();
        Ok((lot, stored))
    }

    fn receive_lot(&self, receipt: LotReceipt) -> Result<(StockLot, StockMovement), StoreError> {
        let mut tables = self.write()?;
        tables.movement_type(receipt.movement_type_id)?;
        if !tables.products.contains_key(&receipt.lot.product_id) {
            return Err(StoreError::not_found("product", receipt.lot.product_id));
        }

        let quantity = receipt.lot.current_quantity;
        let lot = tables.insert_lot(receipt.lot);
        let movement = tables.post(
            quantity,
            NewStockMovement {
                lot_id: lot.lot_id,
                movement_type_id: receipt.movement_type_id,
                quantity,
                cause: MovementCause::Donation,
                notes: receipt.notes,
                created_by: receipt.created_by,
                created_at: receipt.created_at,
            },
        );
        Ok((lot, movement))
    }

    fn relocate_lot(
        &self,
        lot_id: LotId,
        warehouse_id: WarehouseId,
        mark_expired: bool,
    ) -> Result<StockLot, StoreError> {
        let mut tables = self.write()?;
        let lot = tables
            .lots
            .get_mut(&lot_id)
            .ok_or_else(|| StoreError::not_found("lot", lot_id))?;
        lot.warehouse_id = warehouse_id;
        lot.is_expired |= mark_expired;
        Ok(lot.clone())
    }

    fn commit_adjustment_approval(
        &self,
        approval: &AdjustmentApproval,
    ) -> Result<bool, StoreError> {
        let event = &approval.event;
        let mut tables = self.write()?;

        let adjustment = tables
            .adjustments
            .get(&event.adjustment_id)
            .ok_or_else(|| StoreError::not_found("adjustment", event.adjustment_id))?;
        if adjustment.status != AdjustmentStatus::Pending {
            return Ok(false);
        }
        tables.movement_type(approval.movement_type_id)?;
        let quantity = tables.quantity_after(event.lot_id, event.delta)?;

        tables.post(
            quantity,
            NewStockMovement {
                lot_id: event.lot_id,
                movement_type_id: approval.movement_type_id,
                quantity: event.delta,
                cause: MovementCause::Adjustment(event.adjustment_id),
                notes: event.notes.clone(),
                created_by: event.approved_by,
                created_at: event.occurred_at,
            },
        );
        if let Some(adjustment) = tables.adjustments.get_mut(&event.adjustment_id) {
            adjustment.apply(&AdjustmentEvent::Approved(event.clone()));
        }
        Ok(true)
    }

    fn commit_adjustment_rejection(
        &self,
        rejection: &AdjustmentRejected,
    ) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let adjustment = tables
            .adjustments
            .get_mut(&rejection.adjustment_id)
            .ok_or_else(|| StoreError::not_found("adjustment", rejection.adjustment_id))?;
        if adjustment.status != AdjustmentStatus::Pending {
            return Ok(false);
        }
        adjustment.apply(&AdjustmentEvent::Rejected(rejection.clone()));
        Ok(true)
    }

    fn commit_transfer_approval(&self, approval: &TransferApproval) -> Result<bool, StoreError> {
        let event = &approval.event;
        let mut tables = self.write()?;

        let transfer = tables
            .transfers
            .get(&event.transfer_id)
            .ok_or_else(|| StoreError::not_found("transfer", event.transfer_id))?;
        if transfer.status != TransferStatus::Pending {
            return Ok(false);
        }
        tables.movement_type(approval.outbound_type_id)?;
        tables.movement_type(approval.inbound_type_id)?;

        let source = tables.lot(event.lot_id)?.clone();
        ensure_transfer_source(&source, event)?;
        let source_quantity = source
            .quantity_after(-event.quantity)
            .ok_or_else(|| StoreError::insufficient(&source, -event.quantity))?;
        let destination = tables.transfer_destination(&source, event.to_warehouse_id);

        // Validation done; everything below is infallible.
        tables.post(
            source_quantity,
            NewStockMovement {
                lot_id: source.lot_id,
                movement_type_id: approval.outbound_type_id,
                quantity: -event.quantity,
                cause: MovementCause::TransferOut(event.transfer_id),
                notes: event.notes.clone(),
                created_by: event.approved_by,
                created_at: event.occurred_at,
            },
        );

        let (destination_id, destination_quantity) = match destination {
            Some(lot_id) => {
                let current = tables.lots.get(&lot_id).map_or(0, |l| l.current_quantity);
                (lot_id, current + event.quantity)
            }
            None => {
                let created = tables.insert_lot(NewStockLot {
                    product_id: source.product_id,
                    warehouse_id: event.to_warehouse_id,
                    current_quantity: 0,
                    received_date: source.received_date,
                    expiry_date: source.expiry_date,
                    unit_price: source.unit_price,
                });
                (created.lot_id, event.quantity)
            }
        };
        tables.post(
            destination_quantity,
            NewStockMovement {
                lot_id: destination_id,
                movement_type_id: approval.inbound_type_id,
                quantity: event.quantity,
                cause: MovementCause::TransferIn(event.transfer_id),
                notes: event.notes.clone(),
                created_by: event.approved_by,
                created_at: event.occurred_at,
            },
        );

        if let Some(transfer) = tables.transfers.get_mut(&event.transfer_id) {
            transfer.apply(&TransferEvent::Approved(event.clone()));
        }
        Ok(true)
    }

    fn commit_transfer_rejection(
        &self,
        rejection: &TransferRejected,
    ) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let transfer = tables
            .transfers
            .get_mut(&rejection.transfer_id)
            .ok_or_else(|| StoreError::not_found("transfer", rejection.transfer_id))?;
        if transfer.status != TransferStatus::Pending {
            return Ok(false);
        }
        transfer.apply(&TransferEvent::Rejected(rejection.clone()));
        Ok(true)
    }
}
