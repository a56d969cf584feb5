//! Inventory domain module.
//!
//! Business rules for stock lots, the movement ledger, the transfer/adjustment
//! approval workflow and stock alerts, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod adjustment;
pub mod approval;
pub mod lot;
pub mod movement;
pub mod notification;
pub mod product;
pub mod selection;
pub mod transfer;

pub use adjustment::{
    AdjustmentApproved, AdjustmentCommand, AdjustmentDraft, AdjustmentEvent, AdjustmentRejected,
    AdjustmentStatus, ApproveAdjustment, InventoryAdjustment, RejectAdjustment,
};
pub use approval::{RejectionReason, DEFAULT_MIN_REJECTION_REASON_CHARS};
pub use lot::{NewStockLot, StockLot};
pub use movement::{
    MovementCategory, MovementCause, MovementRequest, MovementType, NewStockMovement,
    StockMovement,
};
pub use notification::{
    aggregate_alerts, days_to_expiry, ExpiryNotification, LowStockNotification, NotificationId,
    NotificationKind, StockAlerts,
};
pub use product::{total_stock, Product};
pub use selection::{consumption_order, select_lots, LotDraw, LotSelection};
pub use transfer::{
    ApproveTransfer, RejectTransfer, StockTransfer, TransferApproved, TransferCommand,
    TransferDraft, TransferEvent, TransferRejected, TransferStatus,
};
