use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "inventory.access").
/// A special wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn wildcard() -> Self {
        Self::new("*")
    }

    /// See low-stock and expiry alerts.
    pub fn stock_alerts() -> Self {
        Self::new("stock.alerts")
    }

    /// Read lots, register movements, request transfers and adjustments.
    pub fn inventory_access() -> Self {
        Self::new("inventory.access")
    }

    /// Approve or reject pending transfers and adjustments.
    pub fn inventory_approve() -> Self {
        Self::new("inventory.approve")
    }

    /// Administrative maintenance (e.g. the expired-lot sweep).
    pub fn admin_access() -> Self {
        Self::new("admin.access")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
