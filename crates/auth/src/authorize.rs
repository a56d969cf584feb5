use thiserror::Error;

use crate::{Permission, Principal, RolePolicy};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal against a role policy.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(
    principal: &Principal,
    policy: &RolePolicy,
    required: &Permission,
) -> Result<(), AuthzError> {
    let perms = policy.effective_permissions(&principal.roles);

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %principal.user_id,
            permission = %required,
            "authorization denied"
        );
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use bodega_core::UserId;

    fn principal(role: Role) -> Principal {
        Principal::with_role(UserId::new(), role)
    }

    #[test]
    fn administrator_is_granted_everything() {
        let policy = RolePolicy::standard();
        let admin = principal(Role::administrator());

        for perm in [
            Permission::stock_alerts(),
            Permission::inventory_access(),
            Permission::inventory_approve(),
            Permission::admin_access(),
        ] {
            assert!(authorize(&admin, &policy, &perm).is_ok(), "{perm}");
        }
    }

    #[test]
    fn operator_cannot_approve() {
        let policy = RolePolicy::standard();
        let operator = principal(Role::operator());

        assert!(authorize(&operator, &policy, &Permission::inventory_access()).is_ok());
        assert_eq!(
            authorize(&operator, &policy, &Permission::inventory_approve()),
            Err(AuthzError::Forbidden("inventory.approve".to_string()))
        );
    }

    #[test]
    fn consultant_only_sees_alerts() {
        let policy = RolePolicy::standard();
        let consultant = principal(Role::consultant());

        assert!(authorize(&consultant, &policy, &Permission::stock_alerts()).is_ok());
        assert!(authorize(&consultant, &policy, &Permission::inventory_access()).is_err());
    }

    #[test]
    fn unknown_role_gets_nothing() {
        let policy = RolePolicy::standard();
        let guest = principal(Role::new("Invitado"));

        assert!(authorize(&guest, &policy, &Permission::stock_alerts()).is_err());
    }

    #[test]
    fn permissions_union_across_roles() {
        let policy = RolePolicy::standard();
        let p = Principal::new(UserId::new(), vec![Role::consultant(), Role::operator()]);

        assert!(authorize(&p, &policy, &Permission::inventory_access()).is_ok());
        assert!(authorize(&p, &policy, &Permission::stock_alerts()).is_ok());
    }

    #[test]
    fn grant_is_deduplicated() {
        let policy = RolePolicy::new()
            .grant(Role::operator(), Permission::stock_alerts())
            .grant(Role::operator(), Permission::stock_alerts());

        assert_eq!(policy.permissions_for(&Role::operator()).len(), 1);
    }

    #[test]
    fn role_serializes_as_plain_string() {
        let json = serde_json::to_string(&Role::operator()).unwrap();
        assert_eq!(json, "\"Operador\"");
    }
}
