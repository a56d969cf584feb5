//! Lot-level operations: consumption ordering, direct movements, stock
//! receipt and the expired-lot sweep.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;

use bodega_auth::{Permission, Principal, RolePolicy};
use bodega_core::{DomainError, LotId, ProductId, WarehouseId};
use bodega_inventory::{
    LotSelection, MovementCategory, MovementRequest, NewStockLot, StockLot, StockMovement,
    select_lots,
};

use super::{movement_type_for, require};
use crate::config::InventoryConfig;
use crate::error::ServiceError;
use crate::store::{InventoryStore, LotFilter, LotReceipt};

pub struct LotService<S> {
    store: S,
    policy: Arc<RolePolicy>,
    config: InventoryConfig,
}

impl<S: InventoryStore> LotService<S> {
    pub fn new(store: S, policy: Arc<RolePolicy>, config: InventoryConfig) -> Self {
        Self {
            store,
            policy,
            config,
        }
    }

    /// Lots of `product_id` in `warehouse_id` in FEFO/FIFO consumption order.
    ///
    /// An empty selection is returned as-is; the caller reports "no stock".
    pub fn lots_for_consumption(
        &self,
        principal: &Principal,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        desired: Option<i64>,
    ) -> Result<LotSelection, ServiceError> {
        require(principal, &self.policy, &Permission::inventory_access())?;

        let lots = self
            .store
            .list_lots(&LotFilter::for_product_in(product_id, warehouse_id))?;
        let selection = select_lots(lots, product_id, warehouse_id, desired);

        if selection.no_stock_available() {
            info!(product_id = %product_id, warehouse_id = %warehouse_id, "no stock available");
        } else if !selection.covers_request() {
            info!(
                product_id = %product_id,
                warehouse_id = %warehouse_id,
                available = selection.available(),
                shortfall = selection.shortfall(),
                "selection does not cover the requested quantity"
            );
        }
        Ok(selection)
    }

    /// Register a direct ENTRADA or SALIDA movement against an existing lot.
    pub fn register_movement(
        &self,
        principal: &Principal,
        request: &MovementRequest,
    ) -> Result<StockMovement, ServiceError> {
        require(principal, &self.policy, &Permission::inventory_access())?;

        let movement_type = self
            .store
            .get_movement_type(request.movement_type_id)?
            .ok_or_else(|| ServiceError::not_found("movement type", request.movement_type_id))?;
        let movement = request.resolve(&movement_type, principal.user_id, Utc::now())?;
        let (lot, stored) = self.store.record_movement(movement)?;

        info!(
            movement_id = %stored.movement_id,
            lot_id = %lot.lot_id,
            category = movement_type.category.as_str(),
            quantity = stored.quantity,
            remaining = lot.current_quantity,
            "movement registered"
        );
        Ok(stored)
    }

    /// Create a new lot for incoming stock together with its ENTRADA entry.
    pub fn receive_lot(
        &self,
        principal: &Principal,
        lot: NewStockLot,
        notes: Option<&str>,
    ) -> Result<(StockLot, StockMovement), ServiceError> {
        require(principal, &self.policy, &Permission::inventory_access())?;

        if lot.current_quantity <= 0 {
            return Err(DomainError::validation("received quantity must be positive").into());
        }
        if lot.expiry_date.is_some_and(|expiry| expiry < lot.received_date) {
            return Err(DomainError::validation("expiry date precedes the received date").into());
        }

        let entry = movement_type_for(&self.store, MovementCategory::Entry, true)?;
        let (lot, movement) = self.store.receive_lot(LotReceipt {
            lot,
            movement_type_id: entry.type_id,
            notes: notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
            created_by: principal.user_id,
            created_at: Utc::now(),
        })?;

        info!(
            lot_id = %lot.lot_id,
            product_id = %lot.product_id,
            warehouse_id = %lot.warehouse_id,
            quantity = lot.current_quantity,
            "lot received"
        );
        Ok((lot, movement))
    }

    /// Move every lot that expired before `today` into the quarantine
    /// warehouse and flag it expired. Quantities are untouched.
    ///
    /// Returns the lots that were moved; running it twice moves nothing new.
    pub fn relocate_expired(
        &self,
        principal: &Principal,
        today: NaiveDate,
    ) -> Result<Vec<StockLot>, ServiceError> {
        require(principal, &self.policy, &Permission::admin_access())?;

        let quarantine = self.config.quarantine_warehouse_id;
        let mut moved = Vec::new();
        for lot in self.store.list_lots(&LotFilter::default())? {
            let already_quarantined = lot.warehouse_id == quarantine && lot.is_expired;
            if !lot.is_expired_on(today) || already_quarantined {
                continue;
            }
            let relocated = self.store.relocate_lot(lot.lot_id, quarantine, true)?;
            info!(
                lot_id = %lot.lot_id,
                from_warehouse_id = %lot.warehouse_id,
                to_warehouse_id = %quarantine,
                "expired lot relocated"
            );
            moved.push(relocated);
        }

        info!(count = moved.len(), "expired lot sweep finished");
        Ok(moved)
    }

    /// Ledger entries, newest first, optionally for one lot.
    pub fn movement_history(
        &self,
        principal: &Principal,
        lot_id: Option<LotId>,
    ) -> Result<Vec<StockMovement>, ServiceError> {
        require(principal, &self.policy, &Permission::inventory_access())?;
        Ok(self.store.list_movements(lot_id)?)
    }
}
