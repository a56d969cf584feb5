use serde::{Deserialize, Serialize};

use bodega_core::{BrandId, CategoryId, Entity, ProductId, UnitId};

use crate::lot::StockLot;

/// Product catalog snapshot, as far as stock rules need it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub product_name: String,
    /// Alert when total stock drops strictly below this.
    pub low_stock_threshold: i64,
    pub official_unit_id: Option<UnitId>,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.product_id
    }
}

/// Sum of `current_quantity` over every lot of `product_id`, in any warehouse.
pub fn total_stock<'a, I>(product_id: ProductId, lots: I) -> i64
where
    I: IntoIterator<Item = &'a StockLot>,
{
    lots.into_iter()
        .filter(|l| l.product_id == product_id)
        .map(|l| l.current_quantity)
        .sum()
}
