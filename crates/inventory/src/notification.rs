//! Stock alerts: products running low and products about to expire.
//!
//! Alerts are recomputed from a snapshot every time; whether the user has
//! already seen one is tracked elsewhere, keyed by `NotificationId`.

use core::str::FromStr;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use bodega_core::{DomainError, ProductId};

use crate::lot::StockLot;
use crate::product::Product;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LowStock,
    Expiry,
}

impl NotificationKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::LowStock => "low",
            Self::Expiry => "exp",
        }
    }
}

/// Stable notification key: kind + product, rendered `low-<id>` / `exp-<id>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NotificationId {
    pub kind: NotificationKind,
    pub product_id: ProductId,
}

impl NotificationId {
    pub fn low_stock(product_id: ProductId) -> Self {
        Self {
            kind: NotificationKind::LowStock,
            product_id,
        }
    }

    pub fn expiry(product_id: ProductId) -> Self {
        Self {
            kind: NotificationKind::Expiry,
            product_id,
        }
    }
}

impl core::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.product_id)
    }
}

impl FromStr for NotificationId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, id) = s
            .split_once('-')
            .ok_or_else(|| DomainError::invalid_id(format!("NotificationId: '{s}'")))?;
        let product_id: ProductId = id.parse()?;
        match prefix {
            "low" => Ok(Self::low_stock(product_id)),
            "exp" => Ok(Self::expiry(product_id)),
            _ => Err(DomainError::invalid_id(format!("NotificationId: '{s}'"))),
        }
    }
}

impl TryFrom<String> for NotificationId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NotificationId> for String {
    fn from(value: NotificationId) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockNotification {
    pub product_id: ProductId,
    pub product_name: String,
    pub total_stock: i64,
    pub low_stock_threshold: i64,
}

impl LowStockNotification {
    pub fn id(&self) -> NotificationId {
        NotificationId::low_stock(self.product_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryNotification {
    pub product_id: ProductId,
    pub product_name: String,
    pub soonest_expiry_date: NaiveDate,
    pub days_to_expiry: i64,
}

impl ExpiryNotification {
    pub fn id(&self) -> NotificationId {
        NotificationId::expiry(self.product_id)
    }
}

/// Both alert lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlerts {
    pub low_stock: Vec<LowStockNotification>,
    pub expiring: Vec<ExpiryNotification>,
}

impl StockAlerts {
    pub fn len(&self) -> usize {
        self.low_stock.len() + self.expiring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = NotificationId> + '_ {
        self.low_stock
            .iter()
            .map(LowStockNotification::id)
            .chain(self.expiring.iter().map(ExpiryNotification::id))
    }

    /// Drop every alert whose id is in `read`.
    pub fn without(mut self, read: &HashSet<NotificationId>) -> Self {
        self.low_stock.retain(|n| !read.contains(&n.id()));
        self.expiring.retain(|n| !read.contains(&n.id()));
        self
    }
}

/// Whole days from `today` to `expiry` (negative when already past).
pub fn days_to_expiry(expiry: NaiveDate, today: NaiveDate) -> i64 {
    (expiry - today).num_days()
}

/// Compute low-stock and expiring-soon alerts from a snapshot.
///
/// - Low stock: total quantity across all of a product's lots is strictly
///   below its threshold (a product with no lots has total 0).
/// - Expiring: the product's earliest lot expiry falls in
///   `[today, today + window_days]`.
pub fn aggregate_alerts(
    products: &[Product],
    lots: &[StockLot],
    today: NaiveDate,
    window_days: u32,
) -> StockAlerts {
    let mut by_product: HashMap<ProductId, Vec<&StockLot>> = HashMap::new();
    for lot in lots {
        by_product.entry(lot.product_id).or_default().push(lot);
    }

    let mut alerts = StockAlerts::default();
    for product in products {
        let product_lots = by_product
            .get(&product.product_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let total: i64 = product_lots.iter().map(|l| l.current_quantity).sum();
        if total < product.low_stock_threshold {
            alerts.low_stock.push(LowStockNotification {
                product_id: product.product_id,
                product_name: product.product_name.clone(),
                total_stock: total,
                low_stock_threshold: product.low_stock_threshold,
            });
        }

        let soonest = product_lots.iter().filter_map(|l| l.expiry_date).min();
        if let Some(expiry) = soonest {
            let days = days_to_expiry(expiry, today);
            if (0..=i64::from(window_days)).contains(&days) {
                alerts.expiring.push(ExpiryNotification {
                    product_id: product.product_id,
                    product_name: product.product_name.clone(),
                    soonest_expiry_date: expiry,
                    days_to_expiry: days,
                });
            }
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use bodega_core::{LotId, WarehouseId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn product(id: i64, threshold: i64) -> Product {
        Product {
            product_id: ProductId::new(id),
            product_name: format!("producto {id}"),
            low_stock_threshold: threshold,
            official_unit_id: None,
            category_id: None,
            brand_id: None,
        }
    }

    fn lot(id: i64, product: i64, qty: i64, expiry: Option<NaiveDate>) -> StockLot {
        StockLot {
            lot_id: LotId::new(id),
            product_id: ProductId::new(product),
            warehouse_id: WarehouseId::new(id % 3 + 1),
            current_quantity: qty,
            received_date: date(2025, 1, 1),
            expiry_date: expiry,
            is_expired: false,
            unit_price: 0,
        }
    }

    fn today() -> NaiveDate {
        date(2026, 3, 1)
    }

    #[test]
    fn low_stock_threshold_is_strict() {
        let products = vec![product(1, 10), product(2, 10)];
        let lots = vec![
            lot(1, 1, 5, None),
            lot(2, 1, 3, None),
            lot(3, 2, 6, None),
            lot(4, 2, 4, None),
        ];

        let alerts = aggregate_alerts(&products, &lots, today(), 30);
        assert_eq!(alerts.low_stock.len(), 1);
        assert_eq!(alerts.low_stock[0].product_id, ProductId::new(1));
        assert_eq!(alerts.low_stock[0].total_stock, 8);
    }

    #[test]
    fn product_without_lots_counts_as_zero() {
        let alerts = aggregate_alerts(&[product(1, 1)], &[], today(), 30);
        assert_eq!(alerts.low_stock[0].total_stock, 0);
        assert!(alerts.expiring.is_empty());
    }

    #[test]
    fn expiry_window_is_inclusive_on_both_ends() {
        let products = vec![product(1, 0), product(2, 0), product(3, 0), product(4, 0)];
        let lots = vec![
            lot(1, 1, 1, Some(today())),
            lot(2, 2, 1, Some(date(2026, 3, 31))),
            lot(3, 3, 1, Some(date(2026, 4, 1))),
            lot(4, 4, 1, Some(date(2026, 2, 28))),
        ];

        let alerts = aggregate_alerts(&products, &lots, today(), 30);
        let days: Vec<(i64, i64)> = alerts
            .expiring
            .iter()
            .map(|n| (n.product_id.get(), n.days_to_expiry))
            .collect();
        assert_eq!(days, vec![(1, 0), (2, 30)]);
    }

    #[test]
    fn soonest_dated_lot_wins() {
        let lots = vec![
            lot(1, 1, 1, None),
            lot(2, 1, 1, Some(date(2026, 3, 20))),
            lot(3, 1, 1, Some(date(2026, 3, 5))),
        ];
        let alerts = aggregate_alerts(&[product(1, 0)], &lots, today(), 30);
        assert_eq!(alerts.expiring[0].soonest_expiry_date, date(2026, 3, 5));
        assert_eq!(alerts.expiring[0].days_to_expiry, 4);
    }

    #[test]
    fn notification_ids_render_and_parse() {
        let low = NotificationId::low_stock(ProductId::new(4));
        assert_eq!(low.to_string(), "low-4");
        assert_eq!(
            "exp-12".parse::<NotificationId>().unwrap(),
            NotificationId::expiry(ProductId::new(12))
        );
        assert!("mid-1".parse::<NotificationId>().is_err());
        assert!("low".parse::<NotificationId>().is_err());

        let json = serde_json::to_string(&low).unwrap();
        assert_eq!(json, "\"low-4\"");
        let back: NotificationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, low);
    }

    #[test]
    fn without_filters_by_kind_and_product() {
        let products = vec![product(1, 10)];
        let lots = vec![lot(1, 1, 1, Some(date(2026, 3, 2)))];
        let alerts = aggregate_alerts(&products, &lots, today(), 30);
        assert_eq!(alerts.len(), 2);

        let read: HashSet<_> = [NotificationId::low_stock(ProductId::new(1))].into();
        let unread = alerts.without(&read);
        assert!(unread.low_stock.is_empty());
        assert_eq!(unread.expiring.len(), 1);
    }
}
