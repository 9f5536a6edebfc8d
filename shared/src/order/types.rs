//! Order status lifecycle and command inputs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Order Status
// ============================================================================

/// 订单状态
///
/// `PENDING → PREPARING → READY → DELIVERED → PAID`, plus a fast path from
/// any non-terminal status straight to `PAID`. `PAID` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Delivered,
    Paid,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Paid,
    ];

    /// Next status along the kitchen chain
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => Some(OrderStatus::Paid),
            OrderStatus::Paid => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Whether `target` is an allowed edge from this status
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == OrderStatus::Paid || self.next() == Some(target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Paid => "PAID",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

// ============================================================================
// Payment
// ============================================================================

/// 支付方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => f.write_str("CASH"),
            PaymentMethod::Card => f.write_str("CARD"),
        }
    }
}

// ============================================================================
// Command Inputs
// ============================================================================

/// One cart line submitted with `createOrder`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub product_id: String,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrderLineInput {
    pub fn new(product_id: impl Into<String>, quantity: i32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.product_id.trim().is_empty() {
            return Err("product_id is required".to_string());
        }
        if self.quantity <= 0 {
            return Err(format!(
                "quantity must be positive, got {} for product {}",
                self.quantity, self.product_id
            ));
        }
        Ok(())
    }
}

/// `createOrder` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub table_id: String,
    pub lines: Vec<OrderLineInput>,
    /// Caller-supplied token; a replay returns the order created the first time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl NewOrder {
    pub fn new(table_id: impl Into<String>, lines: Vec<OrderLineInput>) -> Self {
        Self {
            table_id: table_id.into(),
            lines,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.table_id.trim().is_empty() {
            return Err("table_id is required".to_string());
        }
        if self.lines.is_empty() {
            return Err("cart is empty".to_string());
        }
        self.lines.iter().try_for_each(OrderLineInput::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Ready));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn test_fast_path_to_paid() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
        ] {
            assert!(status.can_transition_to(OrderStatus::Paid));
        }
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Preparing));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
        for status in OrderStatus::ALL {
            assert!(!OrderStatus::Paid.can_transition_to(status));
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("ready".parse::<OrderStatus>(), Ok(OrderStatus::Ready));
        assert_eq!("PAID".parse::<OrderStatus>(), Ok(OrderStatus::Paid));
        assert!("CANCELLED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_new_order_validation() {
        let empty = NewOrder::new("t1", vec![]);
        assert_eq!(empty.validate(), Err("cart is empty".to_string()));

        let zero = NewOrder::new("t1", vec![OrderLineInput::new("p1", 0)]);
        assert!(zero.validate().is_err());

        let blank = NewOrder::new("t1", vec![OrderLineInput::new(" ", 1)]);
        assert!(blank.validate().is_err());

        let ok = NewOrder::new("t1", vec![OrderLineInput::new("p1", 2)]);
        assert!(ok.validate().is_ok());
    }
}
