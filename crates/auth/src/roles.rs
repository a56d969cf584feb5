use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles are opaque strings matching the `role_name` stored on user profiles.
/// The three roles the warehouse ships with have named constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMINISTRATOR: &'static str = "Administrador";
    pub const OPERATOR: &'static str = "Operador";
    pub const CONSULTANT: &'static str = "Consultor";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn administrator() -> Self {
        Self::new(Self::ADMINISTRATOR)
    }

    pub fn operator() -> Self {
        Self::new(Self::OPERATOR)
    }

    /// Read-only role (reports and alerts).
    pub fn consultant() -> Self {
        Self::new(Self::CONSULTANT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
