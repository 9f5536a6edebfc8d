//! Floor events published after commit

use crate::order::OrderStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity family an event refers to, used for subscriber filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Order,
    OrderItem,
    Stock,
    ServiceRequest,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Order => write!(f, "order"),
            EntityKind::OrderItem => write!(f, "order_item"),
            EntityKind::Stock => write!(f, "stock"),
            EntityKind::ServiceRequest => write!(f, "service_request"),
        }
    }
}

/// Whether the order still exists after the change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderChange {
    Upserted,
    Deleted,
}

/// 顾客端服务请求类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceRequestType {
    CallWaiter,
    RequestBill,
}

/// State-change notification
///
/// Delivery is at-least-once and not ordered across entities. Payload fields
/// are hints; consumers re-read canonical state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FloorEvent {
    OrderChanged {
        order_id: String,
        restaurant_id: String,
        table_id: String,
        status: OrderStatus,
        change: OrderChange,
    },
    OrderItemChanged {
        order_id: String,
        restaurant_id: String,
        table_id: String,
    },
    StockChanged {
        product_id: String,
        restaurant_id: String,
    },
    ServiceRequestCreated {
        table_id: String,
        restaurant_id: String,
        #[serde(rename = "type")]
        request_type: ServiceRequestType,
    },
}

impl FloorEvent {
    pub fn restaurant_id(&self) -> &str {
        match self {
            FloorEvent::OrderChanged { restaurant_id, .. }
            | FloorEvent::OrderItemChanged { restaurant_id, .. }
            | FloorEvent::StockChanged { restaurant_id, .. }
            | FloorEvent::ServiceRequestCreated { restaurant_id, .. } => restaurant_id,
        }
    }

    /// Table the event concerns; stock events have none
    pub fn table_id(&self) -> Option<&str> {
        match self {
            FloorEvent::OrderChanged { table_id, .. }
            | FloorEvent::OrderItemChanged { table_id, .. }
            | FloorEvent::ServiceRequestCreated { table_id, .. } => Some(table_id),
            FloorEvent::StockChanged { .. } => None,
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            FloorEvent::OrderChanged { .. } => EntityKind::Order,
            FloorEvent::OrderItemChanged { .. } => EntityKind::OrderItem,
            FloorEvent::StockChanged { .. } => EntityKind::Stock,
            FloorEvent::ServiceRequestCreated { .. } => EntityKind::ServiceRequest,
        }
    }

    /// Id of the entity a consumer should re-read
    pub fn entity_id(&self) -> &str {
        match self {
            FloorEvent::OrderChanged { order_id, .. }
            | FloorEvent::OrderItemChanged { order_id, .. } => order_id,
            FloorEvent::StockChanged { product_id, .. } => product_id,
            FloorEvent::ServiceRequestCreated { table_id, .. } => table_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let event = FloorEvent::StockChanged {
            product_id: "p1".into(),
            restaurant_id: "r1".into(),
        };
        assert_eq!(event.restaurant_id(), "r1");
        assert_eq!(event.table_id(), None);
        assert_eq!(event.entity_kind(), EntityKind::Stock);
        assert_eq!(event.entity_id(), "p1");
    }

    #[test]
    fn test_event_wire_shape() {
        let event = FloorEvent::ServiceRequestCreated {
            table_id: "t5".into(),
            restaurant_id: "r1".into(),
            request_type: ServiceRequestType::RequestBill,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "SERVICE_REQUEST_CREATED");
        assert_eq!(json["type"], "REQUEST_BILL");

        let back: FloorEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
