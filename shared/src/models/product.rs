//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity
///
/// Read-only reference for the core except for the stock fields, which the
/// stock ledger maintains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    /// Current list price; snapshotted into order items at add-time
    pub price: Decimal,
    pub is_active: bool,
    /// Per-product stock tracking toggle
    #[serde(default)]
    pub stock_enabled: bool,
    /// Cached balance, equal to the `new_quantity` of the latest movement
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub low_stock_threshold: i64,
}

impl Product {
    pub fn new(restaurant_id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: crate::util::new_id(),
            restaurant_id: restaurant_id.into(),
            name: name.into(),
            price,
            is_active: true,
            stock_enabled: false,
            stock_quantity: 0,
            low_stock_threshold: 0,
        }
    }

    /// 低库存判定（只读派生，不落库）
    pub fn is_low_stock(&self) -> bool {
        self.stock_enabled && self.stock_quantity <= self.low_stock_threshold
    }
}
