use std::collections::{HashMap, HashSet};

use crate::{Permission, Role};

/// Role → permission allow-lists.
///
/// The standard policy mirrors the warehouse's role matrix:
///
/// | role | stock.alerts | inventory.access | inventory.approve | admin.access |
/// |---|---|---|---|---|
/// | Administrador | yes | yes | yes | yes |
/// | Operador | yes | yes | | |
/// | Consultor | yes | | | |
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    grants: HashMap<Role, Vec<Permission>>,
}

impl RolePolicy {
    /// Empty policy: nobody is granted anything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        Self::new()
            .grant(Role::administrator(), Permission::wildcard())
            .grant(Role::operator(), Permission::stock_alerts())
            .grant(Role::operator(), Permission::inventory_access())
            .grant(Role::consultant(), Permission::stock_alerts())
    }

    /// Builder-style grant.
    pub fn grant(mut self, role: Role, permission: Permission) -> Self {
        let perms = self.grants.entry(role).or_default();
        if !perms.contains(&permission) {
            perms.push(permission);
        }
        self
    }

    pub fn permissions_for(&self, role: &Role) -> &[Permission] {
        self.grants.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Union of the permissions granted to every role in `roles`.
    pub fn effective_permissions<'a>(
        &'a self,
        roles: impl IntoIterator<Item = &'a Role>,
    ) -> HashSet<&'a str> {
        roles
            .into_iter()
            .flat_map(|role| self.permissions_for(role))
            .map(Permission::as_str)
            .collect()
    }
}
