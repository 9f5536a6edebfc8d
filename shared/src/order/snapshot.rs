//! Persisted order records

use super::types::{OrderStatus, PaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order record - a table's bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub restaurant_id: String,
    pub table_id: String,
    /// Creator
    pub actor_id: String,
    pub status: OrderStatus,
    /// Σ(quantity × unit_price) over current items
    pub total_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Order line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name snapshot (audit details, kitchen display)
    pub product_name: String,
    pub quantity: i32,
    /// Price snapshot taken at add-time, never updated
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Sum of line totals
pub fn items_total<'a>(items: impl IntoIterator<Item = &'a OrderItem>) -> Decimal {
    items.into_iter().map(OrderItem::line_total).sum()
}

/// Order with its items, as returned by reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}
