//! Application services: authorization, store orchestration and logging
//! around the pure inventory domain.
//!
//! Every operation takes the acting `Principal`, checks the permission it
//! needs against the `RolePolicy`, then talks to the injected store. Errors
//! surface as `ServiceError`.

pub mod approvals;
pub mod lots;
pub mod notifications;

pub use approvals::ApprovalService;
pub use lots::LotService;
pub use notifications::{NotificationService, ReadNotifications};

use bodega_auth::{Permission, Principal, RolePolicy, authorize};
use bodega_inventory::{MovementCategory, MovementType};

use crate::error::ServiceError;
use crate::store::InventoryStore;

fn require(
    principal: &Principal,
    policy: &RolePolicy,
    permission: &Permission,
) -> Result<(), ServiceError> {
    authorize(principal, policy, permission).map_err(|e| {
        tracing::warn!(user_id = %principal.user_id, permission = %permission, "operation denied");
        ServiceError::from(e)
    })
}

/// The active movement type for a category and sign, or a not-found error.
fn movement_type_for<S: InventoryStore>(
    store: &S,
    category: MovementCategory,
    is_positive: bool,
) -> Result<MovementType, ServiceError> {
    store
        .find_movement_type(category, is_positive)?
        .ok_or_else(|| {
            let sign = if is_positive { '+' } else { '-' };
            ServiceError::not_found("movement type", format!("{} ({sign})", category.as_str()))
        })
}
