//! Shared types for the floor operations core
//!
//! Domain types consumed by the core and by every upstream/downstream layer:
//! actors, orders, products, stock movements, broker events and error codes.

pub mod error;
pub mod message;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use error::{ErrorCategory, ErrorCode};
pub use message::{EntityKind, FloorEvent, OrderChange, ServiceRequestType};
pub use models::{
    Actor, DiningTable, MovementType, NewMovement, Product, Role, StockLevel, StockMovement,
};
pub use order::{NewOrder, Order, OrderDetail, OrderItem, OrderLineInput, OrderStatus, PaymentMethod};
pub use rust_decimal::Decimal;
