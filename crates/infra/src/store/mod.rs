//! Inventory persistence boundary.
//!
//! `InventoryStore` is a typed repository over lots, the movement ledger and
//! the two approval workflows. The in-memory implementation serves tests and
//! development; the Postgres implementation is the production backend.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryInventoryStore, standard_movement_types};
pub use postgres::PostgresInventoryStore;
pub use r#trait::{
    AdjustmentApproval, AdjustmentQuery, InventoryStore, LotFilter, LotReceipt, Page, StoreError,
    TransferApproval, TransferQuery,
};
