//! Two-step approval workflow for inventory adjustments and stock transfers.
//!
//! ```text
//! request (inventory.access)
//!   ↓ Draft validated against the lot snapshot, stored as PENDING
//! approve / reject (inventory.approve)
//!   ↓ 1. load the record
//!   ↓ 2. handle the command (pure; refuses unless PENDING)
//!   ↓ 3. commit the event through the store's conditional transition
//!   ↓ 4. apply the event to the loaded record and return it
//! ```
//!
//! Step 3 is the only write. For approvals it also moves stock and appends
//! the ledger entries, all or nothing. A `false` from the store means another
//! session decided the record between steps 1 and 3; that surfaces as a
//! conflict, never as a silent success.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use bodega_auth::{Permission, Principal, RolePolicy};
use bodega_core::{AdjustmentId, Aggregate, LotId, TransferId, WarehouseId};
use bodega_events::Event;
use bodega_inventory::{
    AdjustmentCommand, AdjustmentDraft, AdjustmentEvent, ApproveAdjustment, ApproveTransfer,
    InventoryAdjustment, MovementCategory, RejectAdjustment, RejectTransfer, RejectionReason,
    StockLot, StockTransfer, TransferCommand, TransferDraft, TransferEvent,
};

use super::{movement_type_for, require};
use crate::config::InventoryConfig;
use crate::error::ServiceError;
use crate::store::{
    AdjustmentApproval, AdjustmentQuery, InventoryStore, TransferApproval, TransferQuery,
};

pub struct ApprovalService<S> {
    store: S,
    policy: Arc<RolePolicy>,
    config: InventoryConfig,
}

impl<S: InventoryStore> ApprovalService<S> {
    pub fn new(store: S, policy: Arc<RolePolicy>, config: InventoryConfig) -> Self {
        Self {
            store,
            policy,
            config,
        }
    }

    pub fn request_adjustment(
        &self,
        principal: &Principal,
        lot_id: LotId,
        quantity_after: i64,
        reason: &str,
    ) -> Result<InventoryAdjustment, ServiceError> {
        require(principal, &self.policy, &Permission::inventory_access())?;

        let lot = self.load_lot(lot_id)?;
        let draft =
            AdjustmentDraft::new(&lot, quantity_after, reason, principal.user_id, Utc::now())?;
        let adjustment = self.store.insert_adjustment(draft)?;

        info!(
            adjustment_id = %adjustment.adjustment_id,
            lot_id = %lot_id,
            quantity_before = adjustment.quantity_before,
            quantity_after = adjustment.quantity_after,
            "adjustment requested"
        );
        Ok(adjustment)
    }

    pub fn approve_adjustment(
        &self,
        principal: &Principal,
        adjustment_id: AdjustmentId,
        notes: Option<&str>,
    ) -> Result<InventoryAdjustment, ServiceError> {
        require(principal, &self.policy, &Permission::inventory_approve())?;

        self.decide_adjustment(
            adjustment_id,
            AdjustmentCommand::Approve(ApproveAdjustment {
                adjustment_id,
                approved_by: principal.user_id,
                notes: notes.map(str::to_string),
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn reject_adjustment(
        &self,
        principal: &Principal,
        adjustment_id: AdjustmentId,
        reason: &str,
    ) -> Result<InventoryAdjustment, ServiceError> {
        require(principal, &self.policy, &Permission::inventory_approve())?;
        let reason = RejectionReason::parse(reason, self.config.min_rejection_reason_chars)?;

        self.decide_adjustment(
            adjustment_id,
            AdjustmentCommand::Reject(RejectAdjustment {
                adjustment_id,
                rejected_by: principal.user_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn pending_adjustments(
        &self,
        principal: &Principal,
    ) -> Result<Vec<InventoryAdjustment>, ServiceError> {
        self.adjustment_history(principal, &AdjustmentQuery::pending())
    }

    pub fn adjustment_history(
        &self,
        principal: &Principal,
        query: &AdjustmentQuery,
    ) -> Result<Vec<InventoryAdjustment>, ServiceError> {
        require(principal, &self.policy, &Permission::inventory_access())?;
        Ok(self.store.list_adjustments(query)?)
    }

    pub fn request_transfer(
        &self,
        principal: &Principal,
        lot_id: LotId,
        to_warehouse_id: WarehouseId,
        quantity: i64,
        notes: Option<&str>,
    ) -> Result<StockTransfer, ServiceError> {
        require(principal, &self.policy, &Permission::inventory_access())?;

        let lot = self.load_lot(lot_id)?;
        let draft = TransferDraft::new(
            &lot,
            to_warehouse_id,
            quantity,
            notes,
            principal.user_id,
            Utc::now(),
        )?;
        let transfer = self.store.insert_transfer(draft)?;

        info!(
            transfer_id = %transfer.transfer_id,
            lot_id = %lot_id,
            from_warehouse_id = %transfer.from_warehouse_id,
            to_warehouse_id = %transfer.to_warehouse_id,
            quantity = transfer.quantity,
            "transfer requested"
        );
        Ok(transfer)
    }

    pub fn approve_transfer(
        &self,
        principal: &Principal,
        transfer_id: TransferId,
        notes: Option<&str>,
    ) -> Result<StockTransfer, ServiceError> {
        require(principal, &self.policy, &Permission::inventory_approve())?;

        self.decide_transfer(
            transfer_id,
            TransferCommand::Approve(ApproveTransfer {
                transfer_id,
                approved_by: principal.user_id,
                notes: notes.map(str::to_string),
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn reject_transfer(
        &self,
        principal: &Principal,
        transfer_id: TransferId,
        reason: &str,
    ) -> Result<StockTransfer, ServiceError> {
        require(principal, &self.policy, &Permission::inventory_approve())?;
        let reason = RejectionReason::parse(reason, self.config.min_rejection_reason_chars)?;

        self.decide_transfer(
            transfer_id,
            TransferCommand::Reject(RejectTransfer {
                transfer_id,
                rejected_by: principal.user_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn pending_transfers(
        &self,
        principal: &Principal,
    ) -> Result<Vec<StockTransfer>, ServiceError> {
        self.transfer_history(principal, &TransferQuery::pending())
    }

    pub fn transfer_history(
        &self,
        principal: &Principal,
        query: &TransferQuery,
    ) -> Result<Vec<StockTransfer>, ServiceError> {
        require(principal, &self.policy, &Permission::inventory_access())?;
        Ok(self.store.list_transfers(query)?)
    }

    fn load_lot(&self, lot_id: LotId) -> Result<StockLot, ServiceError> {
        self.store
            .get_lot(lot_id)?
            .ok_or_else(|| ServiceError::not_found("lot", lot_id))
    }

    fn decide_adjustment(
        &self,
        adjustment_id: AdjustmentId,
        command: AdjustmentCommand,
    ) -> Result<InventoryAdjustment, ServiceError> {
        let mut adjustment = self
            .store
            .get_adjustment(adjustment_id)?
            .ok_or_else(|| ServiceError::not_found("adjustment", adjustment_id))?;

        let events = adjustment.handle(&command).inspect_err(|e| {
            warn!(adjustment_id = %adjustment_id, error = %e, "adjustment decision refused");
        })?;

        for event in events {
            let applied = match &event {
                AdjustmentEvent::Approved(approved) => {
                    let movement_type = movement_type_for(
                        &self.store,
                        MovementCategory::Adjustment,
                        approved.delta > 0,
                    )?;
                    self.store.commit_adjustment_approval(&AdjustmentApproval {
                        event: approved.clone(),
                        movement_type_id: movement_type.type_id,
                    })?
                }
                AdjustmentEvent::Rejected(rejected) => {
                    self.store.commit_adjustment_rejection(rejected)?
                }
            };
            if !applied {
                warn!(adjustment_id = %adjustment_id, "adjustment decided by another session");
                return Err(ServiceError::Conflict(format!(
                    "adjustment {adjustment_id} is no longer PENDING"
                )));
            }

            adjustment.apply(&event);
            info!(
                adjustment_id = %adjustment_id,
                lot_id = %adjustment.lot_id,
                event_type = event.event_type(),
                status = adjustment.status.as_str(),
                "adjustment decided"
            );
        }

        Ok(adjustment)
    }

    fn decide_transfer(
        &self,
        transfer_id: TransferId,
        command: TransferCommand,
    ) -> Result<StockTransfer, ServiceError> {
        let mut transfer = self
            .store
            .get_transfer(transfer_id)?
            .ok_or_else(|| ServiceError::not_found("transfer", transfer_id))?;

        let events = transfer.handle(&command).inspect_err(|e| {
            warn!(transfer_id = %transfer_id, error = %e, "transfer decision refused");
        })?;

        for event in events {
            let applied = match &event {
                TransferEvent::Approved(approved) => {
                    let outbound =
                        movement_type_for(&self.store, MovementCategory::Transfer, false)?;
                    let inbound = movement_type_for(&self.store, MovementCategory::Transfer, true)?;
                    self.store.commit_transfer_approval(&TransferApproval {
                        event: approved.clone(),
                        outbound_type_id: outbound.type_id,
                        inbound_type_id: inbound.type_id,
                    })?
                }
                TransferEvent::Rejected(rejected) => {
                    self.store.commit_transfer_rejection(rejected)?
                }
            };
            if !applied {
                warn!(transfer_id = %transfer_id, "transfer decided by another session");
                return Err(ServiceError::Conflict(format!(
                    "transfer {transfer_id} is no longer PENDING"
                )));
            }

            transfer.apply(&event);
            info!(
                transfer_id = %transfer_id,
                lot_id = %transfer.lot_id,
                event_type = event.event_type(),
                status = transfer.status.as_str(),
                "transfer decided"
            );
        }

        Ok(transfer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryInventoryStore;
    use bodega_auth::Role;
    use bodega_core::{ProductId, UserId};
    use bodega_inventory::{AdjustmentStatus, NewStockLot, TransferStatus};
    use chrono::NaiveDate;

    struct Fixture {
        store: Arc<InMemoryInventoryStore>,
        service: ApprovalService<Arc<InMemoryInventoryStore>>,
        operator: Principal,
        admin: Principal,
        lot: StockLot,
    }

    fn fixture(quantity: i64) -> Fixture {
        let store = Arc::new(InMemoryInventoryStore::with_standard_movement_types());
        let lot = store
            .seed_lot(NewStockLot {
                product_id: ProductId::new(1),
                warehouse_id: WarehouseId::new(1),
                current_quantity: quantity,
                received_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                expiry_date: None,
                unit_price: 0,
            })
            .unwrap();
        Fixture {
            service: ApprovalService::new(
                store.clone(),
                Arc::new(RolePolicy::standard()),
                InventoryConfig::default(),
            ),
            store,
            operator: Principal::with_role(UserId::new(), Role::operator()),
            admin: Principal::with_role(UserId::new(), Role::administrator()),
            lot,
        }
    }

    #[test]
    fn operator_can_request_but_not_approve() {
        let f = fixture(100);
        let adjustment = f
            .service
            .request_adjustment(&f.operator, f.lot.lot_id, 95, "merma por humedad")
            .unwrap();
        assert_eq!(adjustment.status, AdjustmentStatus::Pending);
        assert_eq!(adjustment.quantity_before, 100);

        let err = f
            .service
            .approve_adjustment(&f.operator, adjustment.adjustment_id, None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert_eq!(f.store.get_lot(f.lot.lot_id).unwrap().unwrap().current_quantity, 100);
    }

    #[test]
    fn approve_then_reapprove_is_a_conflict() {
        let f = fixture(100);
        let adjustment = f
            .service
            .request_adjustment(&f.operator, f.lot.lot_id, 95, "merma por humedad")
            .unwrap();

        let approved = f
            .service
            .approve_adjustment(&f.admin, adjustment.adjustment_id, Some("  ok  "))
            .unwrap();
        assert_eq!(approved.status, AdjustmentStatus::Approved);
        assert_eq!(approved.approved_by, Some(f.admin.user_id));
        assert_eq!(approved.notes.as_deref(), Some("ok"));

        let err = f
            .service
            .approve_adjustment(&f.admin, adjustment.adjustment_id, None)
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(f.store.get_lot(f.lot.lot_id).unwrap().unwrap().current_quantity, 95);
        assert_eq!(f.store.list_movements(None).unwrap().len(), 1);
    }

    #[test]
    fn short_rejection_reason_is_refused_before_touching_the_store() {
        let f = fixture(10);
        let transfer = f
            .service
            .request_transfer(&f.operator, f.lot.lot_id, WarehouseId::new(2), 4, None)
            .unwrap();

        let err = f
            .service
            .reject_transfer(&f.admin, transfer.transfer_id, "   no    ")
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(
            f.store.get_transfer(transfer.transfer_id).unwrap().unwrap().status,
            TransferStatus::Pending
        );

        let rejected = f
            .service
            .reject_transfer(&f.admin, transfer.transfer_id, "destino sin espacio")
            .unwrap();
        assert_eq!(rejected.status, TransferStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("destino sin espacio"));
        assert_eq!(f.store.get_lot(f.lot.lot_id).unwrap().unwrap().current_quantity, 10);
    }

    #[test]
    fn approving_a_transfer_whose_lot_was_quarantined_is_a_conflict() {
        let f = fixture(20);
        let transfer = f
            .service
            .request_transfer(&f.operator, f.lot.lot_id, WarehouseId::new(2), 8, None)
            .unwrap();
        f.store
            .relocate_lot(f.lot.lot_id, WarehouseId::new(999), true)
            .unwrap();

        let err = f
            .service
            .approve_transfer(&f.admin, transfer.transfer_id, None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(
            f.store.get_transfer(transfer.transfer_id).unwrap().unwrap().status,
            TransferStatus::Pending
        );
        assert_eq!(f.store.get_lot(f.lot.lot_id).unwrap().unwrap().current_quantity, 20);
        assert!(f.store.list_movements(None).unwrap().is_empty());
    }

    #[test]
    fn transfer_request_validates_against_the_lot() {
        let f = fixture(3);
        let err = f
            .service
            .request_transfer(&f.operator, f.lot.lot_id, WarehouseId::new(2), 5, None)
            .unwrap_err();
        assert!(err.is_conflict());

        let err = f
            .service
            .request_transfer(&f.operator, f.lot.lot_id, f.lot.warehouse_id, 1, None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = f
            .service
            .request_transfer(&f.operator, LotId::new(404), WarehouseId::new(2), 1, None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn pending_queue_drops_decided_requests() {
        let f = fixture(50);
        let first = f
            .service
            .request_adjustment(&f.operator, f.lot.lot_id, 40, "conteo")
            .unwrap();
        let second = f
            .service
            .request_adjustment(&f.operator, f.lot.lot_id, 60, "devolución")
            .unwrap();
        f.service
            .reject_adjustment(&f.admin, first.adjustment_id, "conteo duplicado")
            .unwrap();

        let pending: Vec<AdjustmentId> = f
            .service
            .pending_adjustments(&f.operator)
            .unwrap()
            .into_iter()
            .map(|a| a.adjustment_id)
            .collect();
        assert_eq!(pending, vec![second.adjustment_id]);
    }
}
