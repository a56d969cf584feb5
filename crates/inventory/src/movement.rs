//! The stock movement ledger.
//!
//! Every change to a lot's quantity is recorded as an immutable movement with
//! a signed delta and the cause that produced it.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bodega_core::{
    AdjustmentId, DomainError, DomainResult, Entity, LotId, MovementId, MovementTypeId,
    TransferId, UserId,
};

/// Movement category, as stored in `movement_types.category`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementCategory {
    #[serde(rename = "ENTRADA")]
    Entry,
    #[serde(rename = "SALIDA")]
    Exit,
    #[serde(rename = "TRASPASO")]
    Transfer,
    #[serde(rename = "AJUSTE")]
    Adjustment,
}

impl MovementCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "ENTRADA",
            Self::Exit => "SALIDA",
            Self::Transfer => "TRASPASO",
            Self::Adjustment => "AJUSTE",
        }
    }

    /// Transfers and adjustments only move stock through the approval workflow.
    pub fn requires_approval(self) -> bool {
        matches!(self, Self::Transfer | Self::Adjustment)
    }
}

impl FromStr for MovementCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENTRADA" => Ok(Self::Entry),
            "SALIDA" => Ok(Self::Exit),
            "TRASPASO" => Ok(Self::Transfer),
            "AJUSTE" => Ok(Self::Adjustment),
            other => Err(DomainError::validation(format!(
                "unknown movement category '{other}'"
            ))),
        }
    }
}

/// Catalog entry describing a kind of movement and the sign of its effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementType {
    pub type_id: MovementTypeId,
    pub type_name: String,
    pub category: MovementCategory,
    pub is_positive: bool,
    pub is_active: bool,
}

impl MovementType {
    /// Signed lot delta for a positive `quantity` of this movement type.
    pub fn signed(&self, quantity: i64) -> i64 {
        if self.is_positive { quantity } else { -quantity }
    }
}

impl Entity for MovementType {
    type Id = MovementTypeId;

    fn id(&self) -> MovementTypeId {
        self.type_id
    }
}

/// Why a lot's quantity changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reference", rename_all = "snake_case")]
pub enum MovementCause {
    Donation,
    Consumption,
    TransferOut(TransferId),
    TransferIn(TransferId),
    Adjustment(AdjustmentId),
    Manual,
}

impl MovementCause {
    /// Cause recorded for a movement registered directly (outside a workflow).
    pub fn direct(category: MovementCategory) -> Self {
        match category {
            MovementCategory::Entry => Self::Donation,
            MovementCategory::Exit => Self::Consumption,
            MovementCategory::Transfer | MovementCategory::Adjustment => Self::Manual,
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::Donation => "donation",
            Self::Consumption => "consumption",
            Self::TransferOut(_) => "transfer_out",
            Self::TransferIn(_) => "transfer_in",
            Self::Adjustment(_) => "adjustment",
            Self::Manual => "manual",
        }
    }

    /// Id of the workflow record behind this movement, if any.
    pub fn reference(self) -> Option<i64> {
        match self {
            Self::TransferOut(id) | Self::TransferIn(id) => Some(id.get()),
            Self::Adjustment(id) => Some(id.get()),
            Self::Donation | Self::Consumption | Self::Manual => None,
        }
    }

    /// Inverse of `kind()` + `reference()` (row decoding).
    pub fn from_parts(kind: &str, reference: Option<i64>) -> DomainResult<Self> {
        let missing =
            || DomainError::validation(format!("movement cause '{kind}' needs a reference"));
        Ok(match kind {
            "donation" => Self::Donation,
            "consumption" => Self::Consumption,
            "manual" => Self::Manual,
            "transfer_out" => Self::TransferOut(TransferId::new(reference.ok_or_else(missing)?)),
            "transfer_in" => Self::TransferIn(TransferId::new(reference.ok_or_else(missing)?)),
            "adjustment" => Self::Adjustment(AdjustmentId::new(reference.ok_or_else(missing)?)),
            other => {
                return Err(DomainError::validation(format!(
                    "unknown movement cause '{other}'"
                )));
            }
        })
    }
}

/// Ledger entry not yet persisted (the store assigns `movement_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockMovement {
    pub lot_id: LotId,
    pub movement_type_id: MovementTypeId,
    /// Signed delta applied to the lot.
    pub quantity: i64,
    pub cause: MovementCause,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl NewStockMovement {
    pub fn into_movement(self, movement_id: MovementId) -> StockMovement {
        StockMovement {
            movement_id,
            lot_id: self.lot_id,
            movement_type_id: self.movement_type_id,
            quantity: self.quantity,
            cause: self.cause,
            notes: self.notes,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

/// Immutable, append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub movement_id: MovementId,
    pub lot_id: LotId,
    pub movement_type_id: MovementTypeId,
    /// Signed delta applied to the lot.
    pub quantity: i64,
    pub cause: MovementCause,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Entity for StockMovement {
    type Id = MovementId;

    fn id(&self) -> MovementId {
        self.movement_id
    }
}

/// A direct movement against a lot (donation intake, consumption, dispatch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub lot_id: LotId,
    pub movement_type_id: MovementTypeId,
    /// Always positive; the movement type decides the sign.
    pub quantity: i64,
    pub notes: Option<String>,
    pub requesting_department: Option<String>,
    pub recipient_organization: Option<String>,
    pub reference_id: Option<String>,
}

impl MovementRequest {
    /// Resolve the request against its movement type into a ledger entry.
    pub fn resolve(
        &self,
        movement_type: &MovementType,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> DomainResult<NewStockMovement> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if movement_type.type_id != self.movement_type_id {
            return Err(DomainError::invariant("movement type mismatch"));
        }
        if !movement_type.is_active {
            return Err(DomainError::validation(format!(
                "movement type '{}' is inactive",
                movement_type.type_name
            )));
        }
        if movement_type.category.requires_approval() {
            return Err(DomainError::validation(format!(
                "{} movements go through the approval workflow",
                movement_type.category.as_str()
            )));
        }

        Ok(NewStockMovement {
            lot_id: self.lot_id,
            movement_type_id: movement_type.type_id,
            quantity: movement_type.signed(self.quantity),
            cause: MovementCause::direct(movement_type.category),
            notes: self.composed_notes(),
            created_by,
            created_at,
        })
    }

    /// Free-text notes plus the dispatch details, as one note line.
    fn composed_notes(&self) -> Option<String> {
        let parts: Vec<String> = [
            self.notes.clone(),
            self.requesting_department
                .as_ref()
                .map(|d| format!("department: {d}")),
            self.recipient_organization
                .as_ref()
                .map(|o| format!("recipient: {o}")),
            self.reference_id.as_ref().map(|r| format!("ref: {r}")),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();

        if parts.is_empty() { None } else { Some(parts.join("; ")) }
    }
}
