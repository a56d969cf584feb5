//! Runtime configuration for the inventory services.

use std::str::FromStr;

use thiserror::Error;

use bodega_core::WarehouseId;
use bodega_inventory::DEFAULT_MIN_REJECTION_REASON_CHARS;

pub const EXPIRY_ALERT_DAYS_VAR: &str = "BODEGA_EXPIRY_ALERT_DAYS";
pub const QUARANTINE_WAREHOUSE_ID_VAR: &str = "BODEGA_QUARANTINE_WAREHOUSE_ID";
pub const MIN_REJECTION_REASON_CHARS_VAR: &str = "BODEGA_MIN_REJECTION_REASON_CHARS";
pub const READ_NOTIFICATIONS_KEY_VAR: &str = "BODEGA_READ_NOTIFICATIONS_KEY";

pub const DEFAULT_EXPIRY_ALERT_DAYS: u32 = 30;
pub const DEFAULT_QUARANTINE_WAREHOUSE_ID: WarehouseId = WarehouseId::new(999);
pub const DEFAULT_READ_NOTIFICATIONS_KEY: &str = "inventory-read-notifications";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Lots expiring within this many days (inclusive) raise an alert.
    pub expiry_alert_days: u32,
    /// Where the expired-lot sweep relocates lots.
    pub quarantine_warehouse_id: WarehouseId,
    pub min_rejection_reason_chars: usize,
    /// Key of the acknowledged-notification set in the key-value store.
    pub read_notifications_key: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            expiry_alert_days: DEFAULT_EXPIRY_ALERT_DAYS,
            quarantine_warehouse_id: DEFAULT_QUARANTINE_WAREHOUSE_ID,
            min_rejection_reason_chars: DEFAULT_MIN_REJECTION_REASON_CHARS,
            read_notifications_key: DEFAULT_READ_NOTIFICATIONS_KEY.to_string(),
        }
    }
}

impl InventoryConfig {
    /// Read the `BODEGA_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source. Missing keys fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            expiry_alert_days: parsed(&lookup, EXPIRY_ALERT_DAYS_VAR, defaults.expiry_alert_days)?,
            quarantine_warehouse_id: parsed(
                &lookup,
                QUARANTINE_WAREHOUSE_ID_VAR,
                defaults.quarantine_warehouse_id,
            )?,
            min_rejection_reason_chars: parsed(
                &lookup,
                MIN_REJECTION_REASON_CHARS_VAR,
                defaults.min_rejection_reason_chars,
            )?,
            read_notifications_key: match lookup(READ_NOTIFICATIONS_KEY_VAR) {
                Some(key) if !key.trim().is_empty() => key.trim().to_string(),
                Some(key) => {
                    return Err(ConfigError::Invalid {
                        key: READ_NOTIFICATIONS_KEY_VAR,
                        value: key,
                        reason: "must not be blank".to_string(),
                    });
                }
                None => {
                    tracing::warn!(
                        "{READ_NOTIFICATIONS_KEY_VAR} not set; using default {:?}",
                        defaults.read_notifications_key
                    );
                    defaults.read_notifications_key
                }
            },
        })
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => {
            tracing::warn!("{key} not set; using default {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn missing_variables_fall_back_to_defaults() {
        let config = InventoryConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, InventoryConfig::default());
        assert_eq!(config.expiry_alert_days, 30);
        assert_eq!(config.quarantine_warehouse_id, WarehouseId::new(999));
        assert_eq!(config.min_rejection_reason_chars, 10);
        assert_eq!(config.read_notifications_key, "inventory-read-notifications");
    }

    #[test]
    fn variables_override_defaults() {
        let config = InventoryConfig::from_lookup(lookup(&[
            (EXPIRY_ALERT_DAYS_VAR, " 15 "),
            (QUARANTINE_WAREHOUSE_ID_VAR, "42"),
            (MIN_REJECTION_REASON_CHARS_VAR, "4"),
            (READ_NOTIFICATIONS_KEY_VAR, "bodega-leidas"),
        ]))
        .unwrap();

        assert_eq!(config.expiry_alert_days, 15);
        assert_eq!(config.quarantine_warehouse_id, WarehouseId::new(42));
        assert_eq!(config.min_rejection_reason_chars, 4);
        assert_eq!(config.read_notifications_key, "bodega-leidas");
    }

    #[test]
    fn malformed_values_are_errors_not_defaults() {
        let err = InventoryConfig::from_lookup(lookup(&[(EXPIRY_ALERT_DAYS_VAR, "treinta")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: EXPIRY_ALERT_DAYS_VAR, .. }));

        let err = InventoryConfig::from_lookup(lookup(&[(EXPIRY_ALERT_DAYS_VAR, "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = InventoryConfig::from_lookup(lookup(&[(READ_NOTIFICATIONS_KEY_VAR, "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: READ_NOTIFICATIONS_KEY_VAR, .. }));
    }
}
