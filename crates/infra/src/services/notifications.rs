//! Stock alerts and their per-device read state.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use bodega_auth::{Permission, Principal, RolePolicy, authorize};
use bodega_inventory::{NotificationId, StockAlerts, aggregate_alerts};

use crate::config::InventoryConfig;
use crate::error::ServiceError;
use crate::kv::KeyValueStore;
use crate::store::{InventoryStore, LotFilter};

/// Set of acknowledged notification ids, kept as a JSON array of strings
/// (`["low-3", "exp-7"]`) under one key of a `KeyValueStore`.
///
/// An unreadable stored value is treated as "nothing read yet" and is
/// replaced on the next acknowledgement.
pub struct ReadNotifications<K> {
    kv: K,
    key: String,
}

impl<K: KeyValueStore> ReadNotifications<K> {
    pub fn new(kv: K, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn read_ids(&self) -> Result<HashSet<NotificationId>, ServiceError> {
        Ok(match self.kv.get(&self.key)? {
            Some(raw) => self.decode(&raw),
            None => HashSet::new(),
        })
    }

    fn decode(&self, raw: &str) -> HashSet<NotificationId> {
        let entries: Vec<String> = match serde_json::from_str(raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding unreadable read-notification state");
                return HashSet::new();
            }
        };
        entries
            .iter()
            .filter_map(|entry| match entry.parse::<NotificationId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(key = %self.key, entry = %entry, "skipping unknown notification id");
                    None
                }
            })
            .collect()
    }

    pub fn is_read(&self, id: NotificationId) -> Result<bool, ServiceError> {
        Ok(self.read_ids()?.contains(&id))
    }

    /// Acknowledge `id`. Returns `false` when it was already acknowledged,
    /// in which case nothing is written.
    ///
    /// The read and the write happen under the key-value store's lock, so
    /// concurrent acknowledgements of different ids are all kept.
    pub fn mark_as_read(&self, id: NotificationId) -> Result<bool, ServiceError> {
        let written = self.kv.update(&self.key, &mut |current| {
            let mut read = current.map(|raw| self.decode(raw)).unwrap_or_default();
            if !read.insert(id) {
                return Ok(None);
            }
            let sorted: BTreeSet<String> = read.iter().map(ToString::to_string).collect();
            Ok(Some(serde_json::to_string(&sorted)?))
        })?;

        if written {
            debug!(notification_id = %id, "notification marked as read");
        }
        Ok(written)
    }

    pub fn unread(&self, alerts: StockAlerts) -> Result<StockAlerts, ServiceError> {
        Ok(alerts.without(&self.read_ids()?))
    }

    pub fn unread_count(&self, alerts: &StockAlerts) -> Result<usize, ServiceError> {
        let read = self.read_ids()?;
        Ok(alerts.ids().filter(|id| !read.contains(id)).count())
    }
}

pub struct NotificationService<S, K> {
    store: S,
    reads: ReadNotifications<K>,
    policy: Arc<RolePolicy>,
    config: InventoryConfig,
}

impl<S: InventoryStore, K: KeyValueStore> NotificationService<S, K> {
    pub fn new(store: S, kv: K, policy: Arc<RolePolicy>, config: InventoryConfig) -> Self {
        let reads = ReadNotifications::new(kv, config.read_notifications_key.clone());
        Self {
            store,
            reads,
            policy,
            config,
        }
    }

    /// Recompute all alerts from the current snapshot.
    ///
    /// Principals without `stock.alerts` get empty lists, not an error.
    pub fn refresh(
        &self,
        principal: &Principal,
        today: NaiveDate,
    ) -> Result<StockAlerts, ServiceError> {
        if authorize(principal, &self.policy, &Permission::stock_alerts()).is_err() {
            return Ok(StockAlerts::default());
        }

        let products = self.store.list_products()?;
        let lots = self.store.list_lots(&LotFilter::default())?;
        let alerts = aggregate_alerts(&products, &lots, today, self.config.expiry_alert_days);

        debug!(
            low_stock = alerts.low_stock.len(),
            expiring = alerts.expiring.len(),
            "stock alerts refreshed"
        );
        Ok(alerts)
    }

    /// Alerts the principal has not acknowledged yet.
    pub fn unread(
        &self,
        principal: &Principal,
        today: NaiveDate,
    ) -> Result<StockAlerts, ServiceError> {
        let alerts = self.refresh(principal, today)?;
        self.reads.unread(alerts)
    }

    pub fn unread_count(
        &self,
        principal: &Principal,
        today: NaiveDate,
    ) -> Result<usize, ServiceError> {
        let alerts = self.refresh(principal, today)?;
        self.reads.unread_count(&alerts)
    }

    pub fn mark_as_read(&self, id: NotificationId) -> Result<bool, ServiceError> {
        self.reads.mark_as_read(id)
    }

    pub fn read_state(&self) -> &ReadNotifications<K> {
        &self.reads
    }
}
