use serde::{Deserialize, Serialize};

use bodega_core::UserId;

use crate::Role;

/// The authenticated actor behind a service call.
///
/// Construction is the caller's business (session, token, test fixture); this
/// type only carries what authorization and audit stamps need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    /// Convenience for the common single-role profile.
    pub fn with_role(user_id: UserId, role: Role) -> Self {
        Self::new(user_id, vec![role])
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
