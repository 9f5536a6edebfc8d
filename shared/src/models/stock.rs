//! Stock Movement Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// 库存变动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// 入库：balance + quantity
    In,
    /// 出库：max(0, balance - quantity)
    Out,
    /// 盘点：balance = quantity
    Adjustment,
}

impl MovementType {
    /// Apply this movement to a balance
    ///
    /// OUT never drives the balance below zero.
    pub fn apply(&self, previous: i64, requested: i64) -> i64 {
        match self {
            MovementType::In => previous.saturating_add(requested),
            MovementType::Out => previous.saturating_sub(requested).max(0),
            MovementType::Adjustment => requested,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only stock journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub restaurant_id: String,
    pub actor_id: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Quantity as requested by the caller (before clamping)
    pub requested_quantity: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
}

/// `recordMovement` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub product_id: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Caller-supplied token; a replay returns the movement recorded the first time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl NewMovement {
    pub fn new(product_id: impl Into<String>, movement_type: MovementType, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            movement_type,
            quantity,
            notes: None,
            idempotency_key: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// IN / OUT need a positive quantity; ADJUSTMENT may set zero
    pub fn validate(&self) -> Result<(), String> {
        let valid = match self.movement_type {
            MovementType::In | MovementType::Out => self.quantity > 0,
            MovementType::Adjustment => self.quantity >= 0,
        };
        if valid {
            Ok(())
        } else {
            Err(format!(
                "invalid {} quantity {}",
                self.movement_type, self.quantity
            ))
        }
    }
}

/// Current stock level of a product, with the derived low-stock flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: String,
    pub product_name: String,
    pub balance: i64,
    pub stock_enabled: bool,
    pub low_stock_threshold: i64,
    pub low_stock: bool,
}

impl From<&crate::models::Product> for StockLevel {
    fn from(product: &crate::models::Product) -> Self {
        Self {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            balance: product.stock_quantity,
            stock_enabled: product.stock_enabled,
            low_stock_threshold: product.low_stock_threshold,
            low_stock: product.is_low_stock(),
        }
    }
}
