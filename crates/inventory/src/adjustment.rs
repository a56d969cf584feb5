//! Inventory adjustments: a requested correction of one lot's quantity that
//! only takes effect once a privileged user approves it.
//!
//! ```text
//! PENDING ──approve──▶ APPROVED   (lot quantity changes, one AJUSTE movement)
//!    └─────reject───▶ REJECTED   (nothing else changes)
//! ```

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bodega_core::{Aggregate, AdjustmentId, DomainError, DomainResult, Entity, LotId, UserId};
use bodega_events::Event;

use crate::approval::{clean_notes, RejectionReason};
use crate::lot::StockLot;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentStatus {
    Pending,
    Approved,
    Rejected,
}

impl AdjustmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl FromStr for AdjustmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(DomainError::validation(format!(
                "unknown adjustment status '{other}'"
            ))),
        }
    }
}

/// Adjustment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAdjustment {
    pub adjustment_id: AdjustmentId,
    pub lot_id: LotId,
    /// Lot quantity when the adjustment was requested.
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: String,
    pub status: AdjustmentStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<UserId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
}

impl InventoryAdjustment {
    /// Signed change this adjustment applies to its lot.
    pub fn delta(&self) -> i64 {
        self.quantity_after - self.quantity_before
    }
}

impl Entity for InventoryAdjustment {
    type Id = AdjustmentId;

    fn id(&self) -> AdjustmentId {
        self.adjustment_id
    }
}

/// A validated adjustment request, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentDraft {
    pub lot_id: LotId,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl AdjustmentDraft {
    /// Request that `lot` end up holding `quantity_after`.
    ///
    /// The lot's current quantity is captured as `quantity_before`.
    pub fn new(
        lot: &StockLot,
        quantity_after: i64,
        reason: &str,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity_after < 0 {
            return Err(DomainError::validation("quantity_after cannot be negative"));
        }
        if quantity_after == lot.current_quantity {
            return Err(DomainError::validation(
                "quantity_after must differ from the current quantity",
            ));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("reason cannot be empty"));
        }

        Ok(Self {
            lot_id: lot.lot_id,
            quantity_before: lot.current_quantity,
            quantity_after,
            reason: reason.to_string(),
            created_by,
            created_at,
        })
    }

    /// The stored record: every new adjustment starts PENDING.
    pub fn into_adjustment(self, adjustment_id: AdjustmentId) -> InventoryAdjustment {
        InventoryAdjustment {
            adjustment_id,
            lot_id: self.lot_id,
            quantity_before: self.quantity_before,
            quantity_after: self.quantity_after,
            reason: self.reason,
            status: AdjustmentStatus::Pending,
            created_by: self.created_by,
            created_at: self.created_at,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            notes: None,
        }
    }
}

/// Command: ApproveAdjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveAdjustment {
    pub adjustment_id: AdjustmentId,
    pub approved_by: UserId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectAdjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectAdjustment {
    pub adjustment_id: AdjustmentId,
    pub rejected_by: UserId,
    pub reason: RejectionReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentCommand {
    Approve(ApproveAdjustment),
    Reject(RejectAdjustment),
}

/// Event: AdjustmentApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentApproved {
    pub adjustment_id: AdjustmentId,
    pub lot_id: LotId,
    /// Signed quantity change to apply to the lot.
    pub delta: i64,
    pub approved_by: UserId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AdjustmentRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRejected {
    pub adjustment_id: AdjustmentId,
    pub rejected_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentEvent {
    Approved(AdjustmentApproved),
    Rejected(AdjustmentRejected),
}

impl Event for AdjustmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AdjustmentEvent::Approved(_) => "inventory.adjustment.approved",
            AdjustmentEvent::Rejected(_) => "inventory.adjustment.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AdjustmentEvent::Approved(e) => e.occurred_at,
            AdjustmentEvent::Rejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryAdjustment {
    type Command = AdjustmentCommand;
    type Event = AdjustmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AdjustmentEvent::Approved(e) => {
                self.status = AdjustmentStatus::Approved;
                self.approved_by = Some(e.approved_by);
                self.approved_at = Some(e.occurred_at);
                self.notes = e.notes.clone();
            }
            AdjustmentEvent::Rejected(e) => {
                self.status = AdjustmentStatus::Rejected;
                self.rejected_by = Some(e.rejected_by);
                self.rejected_at = Some(e.occurred_at);
                self.rejection_reason = Some(e.reason.clone());
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AdjustmentCommand::Approve(cmd) => self.handle_approve(cmd),
            AdjustmentCommand::Reject(cmd) => self.handle_reject(cmd),
        }
    }
}

impl InventoryAdjustment {
    fn ensure_adjustment_id(&self, adjustment_id: AdjustmentId) -> Result<(), DomainError> {
        if self.adjustment_id != adjustment_id {
            return Err(DomainError::invariant("adjustment_id mismatch"));
        }
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "adjustment {} is already {}",
                self.adjustment_id,
                self.status.as_str()
            )));
        }
        Ok(())
    }

    fn handle_approve(&self, cmd: &ApproveAdjustment) -> Result<Vec<AdjustmentEvent>, DomainError> {
        self.ensure_adjustment_id(cmd.adjustment_id)?;
        self.ensure_pending()?;

        Ok(vec![AdjustmentEvent::Approved(AdjustmentApproved {
            adjustment_id: self.adjustment_id,
            lot_id: self.lot_id,
            delta: self.delta(),
            approved_by: cmd.approved_by,
            notes: clean_notes(cmd.notes.as_deref()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectAdjustment) -> Result<Vec<AdjustmentEvent>, DomainError> {
        self.ensure_adjustment_id(cmd.adjustment_id)?;
        self.ensure_pending()?;

        Ok(vec![AdjustmentEvent::Rejected(AdjustmentRejected {
            adjustment_id: self.adjustment_id,
            rejected_by: cmd.rejected_by,
            reason: cmd.reason.as_str().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bodega_core::{ProductId, WarehouseId};
    use chrono::NaiveDate;

    fn lot(qty: i64) -> StockLot {
        StockLot {
            lot_id: LotId::new(7),
            product_id: ProductId::new(1),
            warehouse_id: WarehouseId::new(1),
            current_quantity: qty,
            received_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            expiry_date: None,
            is_expired: false,
            unit_price: 0,
        }
    }

    fn pending(before: i64, after: i64) -> InventoryAdjustment {
        AdjustmentDraft::new(&lot(before), after, "Merma natural", UserId::new(), Utc::now())
            .unwrap()
            .into_adjustment(AdjustmentId::new(1))
    }

    fn approve(adj: &InventoryAdjustment) -> AdjustmentCommand {
        AdjustmentCommand::Approve(ApproveAdjustment {
            adjustment_id: adj.adjustment_id,
            approved_by: UserId::new(),
            notes: Some("  ".to_string()),
            occurred_at: Utc::now(),
        })
    }

    fn reject(adj: &InventoryAdjustment) -> AdjustmentCommand {
        AdjustmentCommand::Reject(RejectAdjustment {
            adjustment_id: adj.adjustment_id,
            rejected_by: UserId::new(),
            reason: RejectionReason::parse("el conteo fue correcto", 10).unwrap(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn draft_captures_quantity_before() {
        let draft =
            AdjustmentDraft::new(&lot(100), 95, " Merma ", UserId::new(), Utc::now()).unwrap();
        assert_eq!(draft.quantity_before, 100);
        assert_eq!(draft.quantity_after, 95);
        assert_eq!(draft.reason, "Merma");

        let adj = draft.into_adjustment(AdjustmentId::new(3));
        assert_eq!(adj.status, AdjustmentStatus::Pending);
        assert_eq!(adj.delta(), -5);
    }

    #[test]
    fn draft_rejects_invalid_input() {
        let l = lot(10);
        for (after, reason) in [(-1, "x"), (10, "sin cambio"), (5, "   ")] {
            let err =
                AdjustmentDraft::new(&l, after, reason, UserId::new(), Utc::now()).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{after} {reason:?}");
        }
    }

    #[test]
    fn approve_emits_signed_delta() {
        let adj = pending(100, 95);
        let events = adj.handle(&approve(&adj)).unwrap();

        match &events[..] {
            [AdjustmentEvent::Approved(e)] => {
                assert_eq!(e.delta, -5);
                assert_eq!(e.lot_id, LotId::new(7));
                assert_eq!(e.notes, None);
            }
            other => panic!("expected one Approved event, got {other:?}"),
        }
        assert_eq!(events[0].event_type(), "inventory.adjustment.approved");
    }

    #[test]
    fn handle_does_not_mutate() {
        let adj = pending(100, 95);
        let before = adj.clone();
        let _ = adj.handle(&approve(&adj)).unwrap();
        assert_eq!(adj, before);
    }

    #[test]
    fn second_decision_is_a_conflict() {
        let mut adj = pending(100, 95);
        for e in adj.handle(&approve(&adj)).unwrap() {
            adj.apply(&e);
        }
        assert_eq!(adj.status, AdjustmentStatus::Approved);
        assert!(adj.approved_by.is_some());

        let again = adj.handle(&approve(&adj)).unwrap_err();
        assert!(matches!(again, DomainError::Conflict(_)));
        let late_reject = adj.handle(&reject(&adj)).unwrap_err();
        assert!(matches!(late_reject, DomainError::Conflict(_)));
    }

    #[test]
    fn reject_stamps_reason_and_is_terminal() {
        let mut adj = pending(50, 48);
        for e in adj.handle(&reject(&adj)).unwrap() {
            adj.apply(&e);
        }
        assert_eq!(adj.status, AdjustmentStatus::Rejected);
        assert_eq!(adj.rejection_reason.as_deref(), Some("el conteo fue correcto"));
        assert!(adj.handle(&approve(&adj)).is_err());
    }

    #[test]
    fn mismatched_id_is_an_invariant_violation() {
        let adj = pending(10, 9);
        let cmd = AdjustmentCommand::Approve(ApproveAdjustment {
            adjustment_id: AdjustmentId::new(99),
            approved_by: UserId::new(),
            notes: None,
            occurred_at: Utc::now(),
        });
        assert!(matches!(adj.handle(&cmd), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn status_uses_stored_names() {
        assert_eq!(
            serde_json::to_string(&AdjustmentStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!("REJECTED".parse::<AdjustmentStatus>().unwrap(), AdjustmentStatus::Rejected);
    }
}
