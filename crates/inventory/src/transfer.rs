//! Stock transfers between warehouses.
//!
//! ```text
//! PENDING ──approve──▶ APPROVED   (source lot debited, destination lot credited)
//!    └─────reject───▶ REJECTED   (nothing else changes)
//! ```
//!
//! `COMPLETED` exists in stored data from older records; it is read and
//! treated as terminal but never produced here, because approval already
//! executes the move.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bodega_core::{
    Aggregate, DomainError, DomainResult, Entity, LotId, ProductId, TransferId, UserId,
    WarehouseId,
};
use bodega_events::Event;

use crate::approval::{clean_notes, RejectionReason};
use crate::lot::StockLot;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(DomainError::validation(format!(
                "unknown transfer status '{other}'"
            ))),
        }
    }
}

/// Transfer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransfer {
    pub transfer_id: TransferId,
    pub lot_id: LotId,
    pub product_id: ProductId,
    pub from_warehouse_id: WarehouseId,
    pub to_warehouse_id: WarehouseId,
    pub quantity: i64,
    pub status: TransferStatus,
    pub requested_by: UserId,
    pub requested_at: DateTime<Utc>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<UserId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
}

impl Entity for StockTransfer {
    type Id = TransferId;

    fn id(&self) -> TransferId {
        self.transfer_id
    }
}

/// A validated transfer request, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDraft {
    pub lot_id: LotId,
    pub product_id: ProductId,
    pub from_warehouse_id: WarehouseId,
    pub to_warehouse_id: WarehouseId,
    pub quantity: i64,
    pub notes: Option<String>,
    pub requested_by: UserId,
    pub requested_at: DateTime<Utc>,
}

impl TransferDraft {
    /// Request moving `quantity` of `lot` into `to_warehouse_id`.
    pub fn new(
        lot: &StockLot,
        to_warehouse_id: WarehouseId,
        quantity: i64,
        notes: Option<&str>,
        requested_by: UserId,
        requested_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if to_warehouse_id == lot.warehouse_id {
            return Err(DomainError::validation(
                "destination warehouse must differ from the source",
            ));
        }
        if quantity > lot.current_quantity {
            return Err(DomainError::insufficient_stock(quantity, lot.current_quantity));
        }

        Ok(Self {
            lot_id: lot.lot_id,
            product_id: lot.product_id,
            from_warehouse_id: lot.warehouse_id,
            to_warehouse_id,
            quantity,
            notes: clean_notes(notes),
            requested_by,
            requested_at,
        })
    }

    /// The stored record: every new transfer starts PENDING.
    pub fn into_transfer(self, transfer_id: TransferId) -> StockTransfer {
        StockTransfer {
            transfer_id,
            lot_id: self.lot_id,
            product_id: self.product_id,
            from_warehouse_id: self.from_warehouse_id,
            to_warehouse_id: self.to_warehouse_id,
            quantity: self.quantity,
            status: TransferStatus::Pending,
            requested_by: self.requested_by,
            requested_at: self.requested_at,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            notes: self.notes,
        }
    }
}

/// Command: ApproveTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveTransfer {
    pub transfer_id: TransferId,
    pub approved_by: UserId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectTransfer {
    pub transfer_id: TransferId,
    pub rejected_by: UserId,
    pub reason: RejectionReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferCommand {
    Approve(ApproveTransfer),
    Reject(RejectTransfer),
}

/// Event: TransferApproved. Carries everything the store needs to move stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferApproved {
    pub transfer_id: TransferId,
    pub lot_id: LotId,
    pub product_id: ProductId,
    pub from_warehouse_id: WarehouseId,
    pub to_warehouse_id: WarehouseId,
    pub quantity: i64,
    pub approved_by: UserId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRejected {
    pub transfer_id: TransferId,
    pub rejected_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferEvent {
    Approved(TransferApproved),
    Rejected(TransferRejected),
}

impl Event for TransferEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransferEvent::Approved(_) => "inventory.transfer.approved",
            TransferEvent::Rejected(_) => "inventory.transfer.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TransferEvent::Approved(e) => e.occurred_at,
            TransferEvent::Rejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockTransfer {
    type Command = TransferCommand;
    type Event = TransferEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TransferEvent::Approved(e) => {
                self.status = TransferStatus::Approved;
                self.approved_by = Some(e.approved_by);
                self.approved_at = Some(e.occurred_at);
                if e.notes.is_some() {
                    self.notes = e.notes.clone();
                }
            }
            TransferEvent::Rejected(e) => {
                self.status = TransferStatus::Rejected;
                self.rejected_by = Some(e.rejected_by);
                self.rejected_at = Some(e.occurred_at);
                self.rejection_reason = Some(e.reason.clone());
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TransferCommand::Approve(cmd) => self.handle_approve(cmd),
            TransferCommand::Reject(cmd) => self.handle_reject(cmd),
        }
    }
}

impl StockTransfer {
    fn ensure_transfer_id(&self, transfer_id: TransferId) -> Result<(), DomainError> {
        if self.transfer_id != transfer_id {
            return Err(DomainError::invariant("transfer_id mismatch"));
        }
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "transfer {} is already {}",
                self.transfer_id,
                self.status.as_str()
            )));
        }
        Ok(())
    }

    fn handle_approve(&self, cmd: &ApproveTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        self.ensure_transfer_id(cmd.transfer_id)?;
        self.ensure_pending()?;

        Ok(vec![TransferEvent::Approved(TransferApproved {
            transfer_id: self.transfer_id,
            lot_id: self.lot_id,
            product_id: self.product_id,
            from_warehouse_id: self.from_warehouse_id,
            to_warehouse_id: self.to_warehouse_id,
            quantity: self.quantity,
            approved_by: cmd.approved_by,
            notes: clean_notes(cmd.notes.as_deref()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        self.ensure_transfer_id(cmd.transfer_id)?;
        self.ensure_pending()?;

        Ok(vec![TransferEvent::Rejected(TransferRejected {
            transfer_id: self.transfer_id,
            rejected_by: cmd.rejected_by,
            reason: cmd.reason.as_str().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
